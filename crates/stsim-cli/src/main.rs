// crates/stsim-cli/src/main.rs

#![forbid(unsafe_code)]
#![deny(
    rust_2018_idioms,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo
)]

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::{Rng as _, SeedableRng as _};
use std::path::PathBuf;
use tracing::info;

use stsim_core::io::{read_trace_auto, write_profiles_auto, write_trace_auto};
use stsim_core::{Request, TraceFile};
use stsim_mocktails::{HierarchyConfig, ModelType, Partition};

#[derive(Parser, Debug)]
#[command(
    name = "stsim-cli",
    about = "Statistical modeling and synthesis of memory-access traces",
    long_about = "Statistical modeling and synthesis of memory-access traces.\n\n\
                  Use this tool to build a compact statistical profile from a recorded\n\
                  trace (model), to draw a synthetic trace from a profile (synth), and\n\
                  to inspect profile files (dump).",
    version = env!("CARGO_PKG_VERSION"),
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, ValueEnum)]
enum ModelTypeOpt {
    /// Mocktails hierarchy of per-leaf models
    Mocktails,
    /// Spatial-Temporal Memory model
    Stm,
    /// Hierarchical Reuse Distance model
    Hrd,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, ValueEnum)]
enum LeafModelOpt {
    /// Sequence-based leaf models
    Simple,
    /// STM leaf models
    Stm,
    /// Single-layer HRD leaf models
    Hrd,
}

impl From<LeafModelOpt> for ModelType {
    fn from(opt: LeafModelOpt) -> Self {
        match opt {
            LeafModelOpt::Simple => Self::Mocktails,
            LeafModelOpt::Stm => Self::Stm,
            LeafModelOpt::Hrd => Self::Hrd,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Build a statistical profile from a recorded trace.
    Model {
        /// Input trace (JSON/CBOR/JSONL)
        #[arg(long)]
        trace: PathBuf,

        /// Output profile file (JSON/CBOR/JSONL)
        #[arg(long, default_value = "profile.json")]
        out: PathBuf,

        /// Leaf model kind
        #[arg(value_enum, long)]
        model_type: ModelTypeOpt,

        /// Hierarchy configuration (JSON; mocktails only). Without it the
        /// trace is modelled as one monolithic partition.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Underlying model attached to each mocktails leaf
        #[arg(value_enum, long, default_value_t = LeafModelOpt::Simple)]
        leaf_model: LeafModelOpt,

        /// HRD block sizes in bytes, ascending
        #[arg(long, value_delimiter = ',', default_value = "64")]
        layers: Vec<u64>,

        /// SDC rows (stm; power of two)
        #[arg(long, default_value_t = 128)]
        sdc_rows: usize,

        /// SDC columns (stm)
        #[arg(long, default_value_t = 2)]
        sdc_cols: usize,

        /// SPC stride history depth (stm)
        #[arg(long, default_value_t = 80)]
        stride_depth: usize,

        /// Requests per execution phase (0 = one phase for the whole trace)
        #[arg(long, default_value_t = 0)]
        phase_size: u64,
    },

    /// Synthesize a trace from a statistical profile.
    Synth {
        /// Input profile file (JSON/CBOR/JSONL)
        #[arg(long)]
        profile: PathBuf,

        /// Leaf model kind the profile was built with
        #[arg(value_enum, long)]
        model_type: ModelTypeOpt,

        /// Output trace (JSON/CBOR/JSONL)
        #[arg(long, default_value = "trace.json")]
        out: PathBuf,

        /// Random seed; a fixed seed makes the output bit-reproducible
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },

    /// Print a summary of a profile file.
    Dump {
        /// Input profile file (JSON/CBOR/JSONL)
        #[arg(long)]
        profile: PathBuf,

        /// Leaf model kind the profile was built with
        #[arg(value_enum, long)]
        model_type: ModelTypeOpt,
    },
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Model {
            trace,
            out,
            model_type,
            config,
            leaf_model,
            layers,
            sdc_rows,
            sdc_cols,
            stride_depth,
            phase_size,
        } => {
            let stm_params = stsim_stm::Parameters {
                num_rows: sdc_rows,
                num_cols: sdc_cols,
                stride_depth,
            };
            let options = ModelOptions {
                config: config.as_deref(),
                leaf_model: leaf_model.into(),
                layers: &layers,
                stm_params,
                phase_size,
            };
            model(&trace, &out, model_type, &options)
        }
        Cmd::Synth { profile, model_type, out, seed } => synth(&profile, model_type, &out, seed),
        Cmd::Dump { profile, model_type } => dump(&profile, model_type),
    }
}

/// Initialize tracing with an env-driven filter (default INFO).
fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt as _;
    use tracing_subscriber::util::SubscriberInitExt as _;
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer().with_target(false).with_level(true).compact();

    let _ = tracing_subscriber::registry().with(filter).with(fmt_layer).try_init();
}

fn read_requests(path: &std::path::Path) -> Result<Vec<Request>> {
    let trace = read_trace_auto(path).with_context(|| format!("reading {}", path.display()))?;
    info!(packets = trace.len(), "opened trace file: {}", path.display());
    trace.decode_requests().context("decoding trace requests")
}

struct ModelOptions<'a> {
    config: Option<&'a std::path::Path>,
    leaf_model: ModelType,
    layers: &'a [u64],
    stm_params: stsim_stm::Parameters,
    phase_size: u64,
}

fn model(
    trace: &std::path::Path,
    out: &std::path::Path,
    model_type: ModelTypeOpt,
    options: &ModelOptions<'_>,
) -> Result<()> {
    let requests = read_requests(trace)?;
    if requests.is_empty() {
        bail!("trace {} holds no requests", trace.display());
    }

    match model_type {
        ModelTypeOpt::Hrd => {
            let records = model_hrd(&requests, options.layers, options.phase_size)?;
            write_profiles_auto(out, &records)?;
            info!(phases = records.len(), "model written to {}", out.display());
        }
        ModelTypeOpt::Stm => {
            let records = model_stm(&requests, options.stm_params, options.phase_size)?;
            write_profiles_auto(out, &records)?;
            info!(phases = records.len(), "model written to {}", out.display());
        }
        ModelTypeOpt::Mocktails => {
            let hierarchy_config = match options.config {
                Some(path) => stsim_mocktails::config::load_config(path)
                    .with_context(|| format!("loading hierarchy config {}", path.display()))?,
                None => HierarchyConfig::default(),
            };
            let records = model_mocktails(
                requests,
                &hierarchy_config,
                options.leaf_model,
                options.phase_size,
            )?;
            write_profiles_auto(out, &records)?;
            info!(phases = records.len(), "model written to {}", out.display());
        }
    }

    println!("Modelled {} -> {}", trace.display(), out.display());
    Ok(())
}

fn model_hrd(
    requests: &[Request],
    layers: &[u64],
    phase_size: u64,
) -> Result<Vec<stsim_hrd::ProfileRecord>> {
    let mut records = Vec::new();
    let mut profile = stsim_hrd::Profile::new(layers.to_vec())?;
    info!(layers = layers.len(), "configured HRD layers");

    for req in requests {
        profile.update(req.address, req.op);

        if phase_size > 0 && profile.count() % phase_size == 0 {
            records.push(stsim_hrd::ProfileRecord::from_profile(&profile));
            info!(phases = records.len(), "execution phases modelled");
            profile = stsim_hrd::Profile::new(layers.to_vec())?;
        }
    }

    if profile.count() > 0 {
        info!(
            requests = profile.count(),
            unique = profile.unique_addresses(),
            "final phase modelled"
        );
        records.push(stsim_hrd::ProfileRecord::from_profile(&profile));
    }

    Ok(records)
}

fn model_stm(
    requests: &[Request],
    params: stsim_stm::Parameters,
    phase_size: u64,
) -> Result<Vec<stsim_stm::ProfileRecord>> {
    info!(
        rows = params.num_rows,
        cols = params.num_cols,
        depth = params.stride_depth,
        "configured STM tables"
    );

    let mut records = Vec::new();
    let mut profile = stsim_stm::Profile::new(params)?;

    for req in requests {
        profile.update(req.address, req.op);

        if phase_size > 0 && profile.count() % phase_size == 0 {
            records.push(stsim_stm::ProfileRecord::from_profile(&profile));
            info!(phases = records.len(), "execution phases modelled");
            profile = stsim_stm::Profile::new(params)?;
        }
    }

    if profile.count() > 0 {
        records.push(stsim_stm::ProfileRecord::from_profile(&profile));
    }

    Ok(records)
}

fn model_mocktails(
    requests: Vec<Request>,
    config: &HierarchyConfig,
    leaf_model: ModelType,
    phase_size: u64,
) -> Result<Vec<stsim_mocktails::ProfileRecord>> {
    let mut records = Vec::new();
    let mut root = Partition::default();
    let mut profile_id = 0u32;

    for req in requests {
        root.duration = req.tick - root.start_time;
        root.requests.push(req);

        if phase_size > 0 && root.requests.len() as u64 % phase_size == 0 {
            let profile = stsim_mocktails::generate_profile(
                profile_id,
                std::mem::take(&mut root),
                config,
                leaf_model,
            )?;
            records.push(stsim_mocktails::ProfileRecord::from_profile(&profile));

            root.start_time = req.tick;
            profile_id += 1;
            info!(phases = profile_id, "execution phases modelled");
        }
    }

    if !root.requests.is_empty() {
        let profile =
            stsim_mocktails::generate_profile(profile_id, root, config, leaf_model)?;
        records.push(stsim_mocktails::ProfileRecord::from_profile(&profile));
    }

    Ok(records)
}

fn synth(
    profile: &std::path::Path,
    model_type: ModelTypeOpt,
    out: &std::path::Path,
    seed: u64,
) -> Result<()> {
    info!("loading statistical profile from {}", profile.display());
    let mut rng = StdRng::seed_from_u64(seed);

    let requests = match model_type {
        ModelTypeOpt::Hrd => synth_hrd(profile, &mut rng)?,
        ModelTypeOpt::Stm => synth_stm(profile, &mut rng)?,
        ModelTypeOpt::Mocktails => synth_mocktails(profile, &mut rng)?,
    };

    let count = requests.len();
    write_trace_auto(out, &TraceFile::from_requests(requests))
        .with_context(|| format!("writing synthetic trace to {}", out.display()))?;

    println!("Synthesized {count} requests -> {}", out.display());
    Ok(())
}

fn synth_hrd(path: &std::path::Path, rng: &mut StdRng) -> Result<Vec<Request>> {
    let records: Vec<stsim_hrd::ProfileRecord> = stsim_core::io::read_profiles_auto(path)?;

    let mut requests = Vec::new();
    let mut tick = 0u64;
    for record in records {
        let block_size = record.layers.first().copied().unwrap_or(64);
        let request_count = record.total_requests;
        let profile = record.into_profile()?;
        let mut synth = stsim_hrd::Synthesizer::new(profile, rng.random());

        for _ in 0..request_count {
            tick += 1;
            let (address, op) = synth.generate_next_request()?;
            requests.push(Request::new(tick, op, address, block_size as u32));
        }
        info!(total = requests.len(), "requests synthesized so far");
    }

    Ok(requests)
}

fn synth_stm(path: &std::path::Path, rng: &mut StdRng) -> Result<Vec<Request>> {
    let records: Vec<stsim_stm::ProfileRecord> = stsim_core::io::read_profiles_auto(path)?;

    // Assume 32-byte requests.
    const REQUEST_SIZE: u32 = 32;

    let mut requests = Vec::new();
    let mut tick = 0u64;
    for record in records {
        let profile = record.into_profile()?;
        let request_count = profile.count();
        let mut synth = stsim_stm::Synthesizer::new(profile, rng.random());

        for _ in 0..request_count {
            tick += 1;
            let (address, op) = synth.generate_next_request()?;
            requests.push(Request::new(tick, op, address, REQUEST_SIZE));
        }
        info!(total = requests.len(), "requests synthesized so far");
    }

    Ok(requests)
}

fn synth_mocktails(path: &std::path::Path, rng: &mut StdRng) -> Result<Vec<Request>> {
    let records: Vec<stsim_mocktails::ProfileRecord> = stsim_core::io::read_profiles_auto(path)?;

    let mut requests = Vec::new();
    for (id, record) in records.into_iter().enumerate() {
        let mut profile = record.into_profile(id as u32)?;
        let mut synth = stsim_mocktails::Synthesizer::new(&mut profile, rng.random())?;
        while let Some(req) = synth.generate_next_request() {
            requests.push(req);
        }
        info!(total = requests.len(), "requests synthesized so far");
    }

    Ok(requests)
}

fn dump(path: &std::path::Path, model_type: ModelTypeOpt) -> Result<()> {
    match model_type {
        ModelTypeOpt::Hrd => {
            let records: Vec<stsim_hrd::ProfileRecord> = stsim_core::io::read_profiles_auto(path)?;
            println!("profile,total,min.address,max.address,layers");
            for (id, r) in records.iter().enumerate() {
                println!(
                    "{id},{},{},{},{:?}",
                    r.total_requests, r.min_address, r.max_address, r.layers
                );
            }
        }
        ModelTypeOpt::Stm => {
            let records: Vec<stsim_stm::ProfileRecord> = stsim_core::io::read_profiles_auto(path)?;
            println!("profile,total,sdc.updates,writes,min.address,max.address,spc.rows");
            for (id, r) in records.iter().enumerate() {
                println!(
                    "{id},{},{},{},{},{},{}",
                    r.total_requests,
                    r.sdc_updates,
                    r.write_count,
                    r.min_address,
                    r.max_address,
                    r.spc.len()
                );
            }
        }
        ModelTypeOpt::Mocktails => {
            let records: Vec<stsim_mocktails::ProfileRecord> =
                stsim_core::io::read_profiles_auto(path)?;
            println!("profile,node,total,start.time,size.states,time.states,kind");
            for (id, r) in records.iter().enumerate() {
                for leaf in &r.leaves {
                    let kind = match &leaf.payload {
                        stsim_mocktails::metadata::LeafPayload::Simple(_) => "simple",
                        stsim_mocktails::metadata::LeafPayload::Stm(_) => "stm",
                        stsim_mocktails::metadata::LeafPayload::Hrd(_) => "hrd",
                    };
                    println!(
                        "{id},{},{},{},{},{},{kind}",
                        leaf.node_id,
                        leaf.request_count,
                        leaf.start_time,
                        leaf.sizes.transitions.as_ref().map_or(0, Vec::len),
                        leaf.delta_times.transitions.as_ref().map_or(0, Vec::len),
                    );
                }
            }
        }
    }

    Ok(())
}
