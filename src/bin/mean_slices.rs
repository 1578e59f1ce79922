use std::path::PathBuf;
use structopt::StructOpt;
use wind_tools::SliceAverager;

#[derive(Debug, StructOpt)]
#[structopt(name = "mean-slices", about = "Time averaged OpenFOAM slices")]
struct Opt {
    /// Folder with the cases
    #[structopt(default_value = ".")]
    root: PathBuf,
    /// Start of the average from the first time folder [s]
    #[structopt(short, long, default_value = "600")]
    start: i64,
    /// End of the average from the first time folder [s]
    #[structopt(short, long, default_value = "1000")]
    end: i64,
    /// Time between averaged slices [s]
    #[structopt(short, long, default_value = "10")]
    delta: i64,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    let report = SliceAverager::new(&opt.root)
        .start_time(opt.start)
        .stop_time(opt.end)
        .delta(opt.delta)
        .run()?;
    println!("{}", report);
    if !report.failed.is_empty() {
        anyhow::bail!("{} slices failed", report.failed.len());
    }
    Ok(())
}
