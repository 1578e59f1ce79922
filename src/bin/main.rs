use anyhow::Context;
use std::path::{Path, PathBuf};
use structopt::StructOpt;
use wind_tools::{
    flow::{
        self, plot::CutPlaneFigure, plot::WireRunsFigure, read_flow_frame_sowfa, read_vti, Axis,
        CutPlaneBuilder, FlowField, Method,
    },
    layout::{visualize_layout, Layout},
    plot::save,
    plots_enabled,
    slices::SliceAverager,
    sowfa::{self, compare_power, load_cases, plot::SpotCheck},
};

#[derive(Debug, StructOpt)]
#[structopt(name = "wind-tools", about = "Wind farm flow field post-processing")]
enum Opt {
    /// Summary of a flow field file
    Info {
        /// SOWFA array, `.vti` file or SOWFA case folder
        path: PathBuf,
    },
    /// Converts a SOWFA array into a VTK image data file
    ToVti {
        /// SOWFA array or SOWFA case folder
        input: PathBuf,
        /// `.vti` file
        output: PathBuf,
    },
    /// Renders a cut plane through a flow field
    Cut {
        /// SOWFA array, `.vti` file or SOWFA case folder
        path: PathBuf,
        /// Axis normal to the plane: x, y or z
        #[structopt(short, long, default_value = "z")]
        normal: Axis,
        /// Plane location along the normal axis
        #[structopt(short, long, default_value = "90")]
        at: f64,
        /// Mesh points along each in-plane axis
        #[structopt(short, long, default_value = "100")]
        resolution: usize,
        /// Interpolation method: nearest, linear or cubic
        #[structopt(long, default_value = "cubic")]
        method: Method,
        /// Rotor diameter, coordinates are given in diameters
        #[structopt(short, long)]
        diameter: Option<f64>,
        /// Center of the plane in the in-plane axes
        #[structopt(long, number_of_values = 2, allow_hyphen_values = true)]
        center: Option<Vec<f64>>,
        /// Minimum speed of the color map
        #[structopt(long)]
        min: Option<f64>,
        /// Maximum speed of the color map
        #[structopt(long)]
        max: Option<f64>,
        /// Adds contours at the given levels
        #[structopt(long, allow_hyphen_values = true)]
        levels: Vec<f64>,
        /// Paper style: white contours and reference rotor
        #[structopt(long)]
        paper: bool,
        /// Adds in-plane velocity arrows every given mesh points
        #[structopt(long)]
        quiver: Option<usize>,
        /// Turbine rotor as `x,y,yaw,diameter`
        #[structopt(long, parse(try_from_str = parse_turbine), allow_hyphen_values = true)]
        turbine: Vec<[f64; 4]>,
        /// Also plots the wire runs along both in-plane axes
        #[structopt(long)]
        wire_runs: bool,
        /// Figure file
        #[structopt(short, long, default_value = "cut_plane.png")]
        output: PathBuf,
    },
    /// Compares the turbine power across SOWFA cases
    Power {
        /// Case folders, read from the file given by `SOWFA_CASES` if empty
        cases: Vec<String>,
        /// Folder with the cases, defaults to `SOWFA_REPO`
        #[structopt(long)]
        root: Option<PathBuf>,
        /// Glob pattern of the case folders in the root folder
        #[structopt(long)]
        pattern: Option<String>,
        /// Case names
        #[structopt(long)]
        names: Vec<String>,
        /// Turbine outputs folder within a case
        #[structopt(long, default_value = "turbineOutput/20000")]
        sub_folder: String,
        /// Power channel
        #[structopt(long, default_value = "powerGenerator")]
        channel: String,
        /// Percent change with respect to the case with base in its name
        #[structopt(long)]
        relative: bool,
        /// Keeps only whole periods of the given length in seconds
        #[structopt(long)]
        per_time: Option<f64>,
        /// Saves the turbine outputs to a CSV file
        #[structopt(long)]
        csv: Option<PathBuf>,
        /// Spot check figure of the given channels
        #[structopt(long)]
        spot_check: Vec<String>,
        /// Bar chart file
        #[structopt(short, long, default_value = "power.png")]
        output: PathBuf,
    },
    /// Plots a wind farm layout
    Layout {
        /// CSV file with the header `turbine,x,y`
        path: PathBuf,
        /// Rotor diameter
        #[structopt(short, long, default_value = "126")]
        diameter: f64,
        /// Rotates the layout counter-clockwise by the given angle in degrees
        #[structopt(long, allow_hyphen_values = true)]
        direction: Option<f64>,
        /// Draws the wake lines
        #[structopt(long)]
        wake_lines: bool,
        /// Maximum length of the wake lines
        #[structopt(long)]
        limit: Option<f64>,
        /// Figure file
        #[structopt(short, long, default_value = "layout.png")]
        output: PathBuf,
    },
    /// Time averages the slices of all the cases in a folder
    MeanSlices {
        /// Folder with the cases
        root: PathBuf,
        /// Start of the average from the first time folder [s]
        #[structopt(long, default_value = "600")]
        start: i64,
        /// End of the average from the first time folder [s]
        #[structopt(long, default_value = "1000")]
        stop: i64,
        /// Time between averaged slices [s]
        #[structopt(long, default_value = "10")]
        delta: i64,
        #[structopt(long, default_value = "sliceDataInstant")]
        slice_folder: String,
        #[structopt(long, default_value = "slicePost")]
        output_folder: String,
    },
}

fn parse_turbine(arg: &str) -> Result<[f64; 4], String> {
    let values = arg
        .split(',')
        .map(|s| s.trim().parse::<f64>().map_err(|e| format!("{}: {}", s, e)))
        .collect::<Result<Vec<f64>, String>>()?;
    <[f64; 4]>::try_from(values).map_err(|_| format!("expected x,y,yaw,diameter, found {}", arg))
}

fn load_flow(path: &Path) -> anyhow::Result<FlowField> {
    let field = if path.is_dir() {
        read_flow_frame_sowfa(flow::get_flow_file(path)?)?
    } else if path.extension().and_then(|e| e.to_str()) == Some("vti") {
        read_vti(path)?
    } else {
        read_flow_frame_sowfa(path)?
    };
    Ok(field)
}

fn in_plane_axes(normal: Axis) -> (Axis, Axis) {
    match normal {
        Axis::X => (Axis::Y, Axis::Z),
        Axis::Y => (Axis::X, Axis::Z),
        Axis::Z => (Axis::X, Axis::Y),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    match opt {
        Opt::Info { path } => {
            let field = load_flow(&path)?;
            println!("{}", field);
        }
        Opt::ToVti { input, output } => {
            let field = load_flow(&input)?;
            let grid = field
                .grid()
                .with_context(|| format!("{:?} is not a structured flow field", input))?;
            flow::create_vti(&field, grid.spacing, grid.dimensions, &output)?;
        }
        Opt::Cut {
            path,
            normal,
            at,
            resolution,
            method,
            diameter,
            center,
            min,
            max,
            levels,
            paper,
            quiver,
            turbine,
            wire_runs,
            output,
        } => {
            let field = load_flow(&path)?;
            let (x1, x2) = in_plane_axes(normal);
            let mut builder = CutPlaneBuilder::new(&field)
                .axes(x1, x2)
                .at(at)
                .resolution(resolution)
                .method(method);
            if normal == Axis::X {
                builder = builder.invert_x1();
            }
            if let Some(center) = center {
                builder = builder.center(center[0], center[1]);
            }
            if let Some(diameter) = diameter {
                builder = builder.diameter(diameter);
            }
            let plane = builder.build()?;
            println!("{}", plane);

            let mut figure = CutPlaneFigure::new(&plane).speed_range(min, max);
            if paper {
                figure = figure
                    .contours(Some(flow::plot::PAPER_LEVELS.to_vec()), plotters::style::WHITE)
                    .reference_rotor();
            } else if !levels.is_empty() {
                figure = figure.contours(Some(levels), plotters::style::BLACK);
            }
            if let Some(down_sampling) = quiver {
                figure = figure.quiver(down_sampling);
            }
            for [x, y, yaw, d] in turbine {
                figure = figure.turbine(x, y, yaw, d);
            }
            save(&figure, &output)?;
            if wire_runs {
                let stem = output.with_extension("");
                save(
                    &WireRunsFigure::along_x1(&plane),
                    format!("{}_{}.png", stem.display(), x1),
                )?;
                save(
                    &WireRunsFigure::along_x2(&plane),
                    format!("{}_{}.png", stem.display(), x2),
                )?;
            }
        }
        Opt::Power {
            cases,
            root,
            pattern,
            names,
            sub_folder,
            channel,
            relative,
            per_time,
            csv,
            spot_check,
            output,
        } => {
            let root = match root {
                Some(root) => root,
                None => sowfa::cases_root().context("no root given and SOWFA_REPO is not set")?,
            };
            let cases = match (cases.is_empty(), pattern) {
                (false, _) => cases,
                (true, Some(pattern)) => sowfa::find_cases(&root, &pattern)?,
                (true, None) => sowfa::cases_from_env()
                    .context("no case given and SOWFA_CASES is not set")?,
            };
            let mut frame = load_cases(&cases[..], &root, &names[..], &sub_folder)?;
            if let Some(per_time) = per_time {
                frame.truncate_to_periods(per_time)?;
            }
            println!("{}", frame);
            if let Some(path) = csv {
                frame.to_csv(path)?;
            }
            let comparison = compare_power(&frame, &channel, relative)?;
            println!("{}", comparison);
            if plots_enabled() {
                comparison.plot(&output)?;
                if !spot_check.is_empty() {
                    save(
                        &SpotCheck::new(&frame, &spot_check[..])?,
                        output.with_file_name("spot_check.png"),
                    )?;
                }
            }
        }
        Opt::Layout {
            path,
            diameter,
            direction,
            wake_lines,
            limit,
            output,
        } => {
            let mut layout = Layout::from_csv(&path)?;
            if let Some(angle) = direction {
                layout = layout.set_direction(angle);
            }
            println!("{}", layout);
            if wake_lines {
                for line in layout.wake_lines(diameter, limit) {
                    println!("{:>6} -> {:>6}: {}", line.from, line.to, line);
                }
            }
            visualize_layout(&layout, diameter, wake_lines, limit, &output)?;
        }
        Opt::MeanSlices {
            root,
            start,
            stop,
            delta,
            slice_folder,
            output_folder,
        } => {
            let report = SliceAverager::new(root)
                .start_time(start)
                .stop_time(stop)
                .delta(delta)
                .slice_folder(slice_folder)
                .output_folder(output_folder)
                .run()?;
            println!("{}", report);
        }
    }

    Ok(())
}
