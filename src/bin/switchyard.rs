use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use switchyard::engine::apply_plan;
use switchyard::{
    Collaborators, CompileRequest, CompositeVertex, FfmpegEngine, FfmpegFactory, LocalTransport,
    MemoryStore, StoreSnapshot, TcpDialer, Transport as _, VertexHost, VertexSettings, compile_graph,
};

#[derive(Parser, Debug)]
#[command(name = "switchyard", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a snapshot into an ffmpeg filter graph and print it.
    Compile(CompileArgs),
    /// Run a composite vertex against a snapshot (requires `ffmpeg` on PATH).
    Run(RunArgs),
}

#[derive(Parser, Debug)]
struct CompileArgs {
    /// Snapshot JSON holding the vertex, its broadcast and the scene list.
    #[arg(long)]
    snapshot: PathBuf,

    /// Settings JSON; defaults apply when omitted.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Control endpoint port written into the graph.
    #[arg(long, default_value_t = 5555)]
    control_port: u16,

    /// Print the full ffmpeg argument list as JSON instead of the filter graph.
    #[arg(long)]
    args: bool,
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Snapshot JSON holding the vertex, its broadcast and the scene list.
    #[arg(long)]
    snapshot: PathBuf,

    /// Settings JSON; defaults apply when omitted.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Host media and control endpoints are allocated on.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Compile(args) => cmd_compile(args),
        Command::Run(args) => cmd_run(args).await,
    }
}

fn load(snapshot: &Path, settings: Option<&Path>) -> anyhow::Result<(StoreSnapshot, VertexSettings)> {
    let snapshot = StoreSnapshot::from_path(snapshot)
        .with_context(|| format!("load snapshot '{}'", snapshot.display()))?;
    let settings = match settings {
        Some(path) => VertexSettings::from_path(path)
            .with_context(|| format!("load settings '{}'", path.display()))?,
        None => VertexSettings::default(),
    };
    Ok((snapshot, settings))
}

fn cmd_compile(args: CompileArgs) -> anyhow::Result<()> {
    let (snapshot, settings) = load(&args.snapshot, args.settings.as_deref())?;
    let transport = LocalTransport::default();

    let mut inputs = snapshot.vertex.inputs.clone();
    for socket in inputs.iter_mut().flat_map(|i| i.sockets.iter_mut()) {
        if socket.url.is_none() {
            socket.url = Some(transport.input_url()?);
        }
    }
    let scenes = switchyard::config::model::sort_scenes(snapshot.scenes);
    let video_output_url = transport.output_url()?;
    let audio_output_url = transport.output_url()?;
    let plan = compile_graph(&CompileRequest {
        inputs: &inputs,
        scenes: &scenes,
        active_scene: snapshot.broadcast.active_scene_id.as_ref(),
        video_output_url: &video_output_url,
        audio_output_url: &audio_output_url,
        control_port: args.control_port,
        settings: &settings,
    })
    .context("compile scene graph")?;

    if args.args {
        let mut engine = FfmpegEngine::new(settings.engine.clone());
        apply_plan(&mut engine, &plan).context("declare graph on engine")?;
        println!("{}", serde_json::to_string_pretty(&engine.command_args())?);
    } else {
        for chain in &plan.chains {
            println!("{}", chain.render());
        }
    }
    Ok(())
}

async fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let (snapshot, settings) = load(&args.snapshot, args.settings.as_deref())?;
    if !switchyard::engine::ffmpeg::is_ffmpeg_available(&settings.engine.ffmpeg_path) {
        anyhow::bail!("'{}' is not runnable; install ffmpeg or set engine.ffmpeg_path", settings.engine.ffmpeg_path);
    }

    let store = Arc::new(MemoryStore::from_snapshot(&snapshot));
    let collaborators = Collaborators {
        store: store.clone(),
        transport: Arc::new(LocalTransport::new(args.host)),
        engines: Arc::new(FfmpegFactory),
        control: Arc::new(TcpDialer),
    };
    let host = VertexHost::new(settings.retry.clone());
    let mut vertex = CompositeVertex::new(
        snapshot.vertex,
        settings,
        collaborators,
        tokio::time::Instant::now(),
    );

    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for interrupt");
            return;
        }
        tracing::info!("interrupt received; shutting down");
        on_signal.cancel();
    });

    host.run(&mut vertex, shutdown)
        .await
        .context("vertex gave up")?;
    Ok(())
}
