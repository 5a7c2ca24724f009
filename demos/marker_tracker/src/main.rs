use argh::FromArgs;
use std::{path::PathBuf, sync::atomic::Ordering};

use quadpose::{DisplaySink, MarkerPipeline, PipelineConfig, ThresholdParams, Tracker};

mod io;

use io::{ConsoleReport, DirectorySource, Displays, PngDisplay, ThresholdFile};

#[derive(FromArgs, Debug)]
/// Track a color marker through a sequence of frames and print its pose
struct Args {
    /// directory with the input frames (png or jpg, read in name order)
    #[argh(option, short = 'i')]
    input_dir: PathBuf,
    /// path to a JSON pipeline config, defaults are used when omitted
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,
    /// path to a JSON file with the color thresholds, re-read when it changes
    #[argh(option, short = 't', default = "PathBuf::from(\"thresholds.json\")")]
    thresholds: PathBuf,
    /// directory the display images are written to
    #[argh(option, short = 'o', default = "PathBuf::from(\"output\")")]
    output_dir: PathBuf,
    /// restart from the first frame after the last one
    #[argh(switch, short = 'l')]
    loop_forever: bool,
    /// also stream the display images to a rerun viewer
    #[argh(switch)]
    rerun: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    let pipeline = MarkerPipeline::new(config)?;

    // a missing source is fatal before the loop starts
    let source = DirectorySource::open(&args.input_dir, args.loop_forever)?;

    let knobs = ThresholdFile::new(args.thresholds.clone(), ThresholdParams::default());

    #[allow(unused_mut)]
    let mut sinks: Vec<Box<dyn DisplaySink>> =
        vec![Box::new(PngDisplay::new(args.output_dir.clone())?)];
    if args.rerun {
        #[cfg(feature = "rerun")]
        sinks.push(Box::new(io::RerunDisplay::spawn()?));
        #[cfg(not(feature = "rerun"))]
        log::warn!("built without the rerun feature, ignoring --rerun");
    }

    let mut tracker = Tracker::new(pipeline, source, knobs, Displays(sinks), ConsoleReport);

    ctrlc::set_handler({
        let cancel_token = tracker.stop_handle();
        move || {
            println!("Received Ctrl-C signal. Sending cancel signal !!");
            cancel_token.store(true, Ordering::SeqCst);
        }
    })?;

    let summary = tracker.run()?;
    println!(
        "processed {} frames: {} poses, {} without marker, {} degenerate",
        summary.frames, summary.poses, summary.no_marker, summary.degenerate
    );

    Ok(())
}
