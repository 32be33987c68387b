use bilinear_video_upscaler::arguments::Arguments;
use bilinear_video_upscaler::pipeline::{
    Artifact, EncodeConfig, FfmpegSink, FfmpegSource, FrameSource, JobState, Pipeline, ProgressBarObserver,
};

use anyhow::Context;
use clap::Parser;
use tracing::Level;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_pipeline(arguments: &Arguments) -> anyhow::Result<()> {
    let options = arguments.job_options()?;
    arguments.validate_input()?;
    arguments.check_ffmpeg()?;
    arguments.validate_encoder()?;
    let output = arguments.output_path()?;

    let mut source = FfmpegSource::new(arguments.input.clone(), options.target_frame_rate);
    let metadata = source
        .metadata()
        .with_context(|| format!("failed to read video metadata from '{}'", arguments.input.display()))?;
    let upscaled = metadata.dimensions.scaled(options.scale)?;

    println!("Input:      {}", arguments.input.display());
    println!("Output:     {}", output.display());
    println!("Scale:      {}", options.scale);
    println!("Encoder:    {}", arguments.encoder);
    println!("Resolution: {} -> {}", metadata.dimensions, upscaled);

    let sink = FfmpegSink::new(EncodeConfig::new(output.clone(), arguments.encoder.clone()))?;
    let label = format!("{} -> {}", arguments.input.display(), output.display());
    let observer = ProgressBarObserver::new(&label, metadata.dimensions, upscaled, options.scale, &arguments.encoder);
    let mut pipeline = Pipeline::new(source, sink, observer, options)?;

    // ffmpeg runs in its own process group, so Ctrl-C only reaches us and the
    // pipeline gets to discard the partial output.
    let handle = pipeline.cancel_handle();
    ctrlc::set_handler(move || handle.cancel()).context("failed to install Ctrl-C handler")?;

    let outcome = match pipeline.run() {
        Ok(outcome) => outcome,
        Err(e) => {
            let (_, _, observer) = pipeline.into_parts();
            observer.abandon();
            return Err(e).context("upscaling failed");
        }
    };

    match (outcome.state, outcome.artifact) {
        (JobState::Completed, Some(Artifact::File(path))) => {
            println!("Completed! {} frames written to {}", outcome.frames, path.display());
            Ok(())
        }
        (state, _) => {
            let (_, _, observer) = pipeline.into_parts();
            observer.abandon();
            anyhow::bail!("finished without output ({:?}) after {} frames", state, outcome.frames)
        }
    }
}

fn main() {
    let arguments = Arguments::parse();
    init_logging(arguments.verbose);

    if let Err(error) = run_pipeline(&arguments) {
        eprintln!("Error: {:#}", error);
        std::process::exit(1);
    }
}
