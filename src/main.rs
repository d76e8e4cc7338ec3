use bvh_motion_viz::animate::animate;
use bvh_motion_viz::config::Config;
use bvh_motion_viz::loader::MotionLoader;
use bvh_motion_viz::render::FrameRenderer;
use bvh_motion_viz::types::MotionSample;
use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(version, about = "Render .bvh motion capture skeletons to PNG stills and GIFs")]
struct Cli {
    /// TOML config file; built in defaults are used without one
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding one sub directory of .bvh files per subject
    #[arg(long)]
    data_root: Option<PathBuf>,

    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Camera elevation in degrees
    #[arg(long, allow_negative_numbers = true)]
    elev: Option<f64>,

    /// Camera azimuth in degrees
    #[arg(long, allow_negative_numbers = true)]
    azim: Option<f64>,

    /// Width and height of the output in pixels
    #[arg(long)]
    size: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the sequences found for every configured subject
    List,

    /// Render one frame of one sequence to a PNG
    Still {
        #[arg(long)]
        subject: String,
        #[arg(long, default_value_t = 0)]
        sample: usize,
        #[arg(long, default_value_t = 0)]
        frame: usize,
        /// Defaults to <output_dir>/elev-<elev>-azim-<azim>.png
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Render a whole sequence to a looping GIF
    Animate {
        #[arg(long)]
        subject: String,
        #[arg(long, default_value_t = 0)]
        sample: usize,
        /// Overrides the configured frame rate
        #[arg(long)]
        fps: Option<u32>,
        /// Defaults to <output_dir>/<subject>_sample<sample>.gif
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{}", err);
            let mut source = err.source();
            while let Some(cause) = source {
                log::error!("  caused by: {}", cause);
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config, Box<dyn Error>> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(data_root) = &cli.data_root {
        config.data_root = data_root.clone();
    }
    if let Some(output_dir) = &cli.output_dir {
        config.output_dir = output_dir.clone();
    }
    if let Some(elev) = cli.elev {
        config.view.elevation = elev;
    }
    if let Some(azim) = cli.azim {
        config.view.azimuth = azim;
    }
    if let Some(size) = cli.size {
        config.view.image_size = size;
    }
    config.validate()?;
    Ok(config)
}

fn pick_sample(
    loader: &MotionLoader,
    subject: &str,
    index: usize,
) -> Result<MotionSample, Box<dyn Error>> {
    let mut samples = loader.load_subject(subject)?;
    if index >= samples.len() {
        return Err(format!(
            "Subject {} has {} samples, sample {} does not exist",
            subject,
            samples.len(),
            index
        )
        .into());
    }
    Ok(samples.swap_remove(index))
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = load_config(&cli)?;
    let topology = config.topology()?;
    let loader = MotionLoader::from_config(&config);

    match cli.command {
        Command::List => {
            for subject in loader.load_subjects(&config.subjects)? {
                println!("{}", subject.id);
                for (index, sample) in subject.samples.iter().enumerate() {
                    println!(
                        "  [{}] {}: {} frames, {} joints",
                        index,
                        sample.name,
                        sample.num_frames(),
                        sample.num_joints()
                    );
                }
            }
        }
        Command::Still {
            subject,
            sample,
            frame,
            out,
        } => {
            let mut view = config.view;
            view.show_box = true;
            let renderer = FrameRenderer::new(view);

            let motion = pick_sample(&loader, &subject, sample)?;
            let positions = motion.frames.get(frame).ok_or_else(|| {
                format!(
                    "Sample {} of {} has {} frames, frame {} does not exist",
                    sample,
                    subject,
                    motion.num_frames(),
                    frame
                )
            })?;
            let path = out.unwrap_or_else(|| {
                config
                    .output_dir
                    .join(format!("elev-{}-azim-{}.png", view.elevation, view.azimuth))
            });
            renderer.save_still(
                positions,
                &topology,
                &format!("{} - frame {}", subject, frame),
                &path,
            )?;
        }
        Command::Animate {
            subject,
            sample,
            fps,
            out,
        } => {
            let renderer = FrameRenderer::new(config.view);
            let motion = pick_sample(&loader, &subject, sample)?;
            let path = out.unwrap_or_else(|| {
                config
                    .output_dir
                    .join(format!("{}_sample{}.gif", subject, sample))
            });
            log::info!(
                "Animating {} sample {} ({} frames)",
                subject,
                sample,
                motion.num_frames()
            );
            let artifact = animate(
                &renderer,
                &motion.frames,
                &topology,
                &path,
                fps.unwrap_or(config.fps),
                &subject,
            )?;
            log::debug!("{:?}", artifact);
        }
    }
    Ok(())
}
