//! Side-Channel Toolkit Command-Line Interface
//!
//! This CLI provides tools for:
//! - Generating input texts for acquisition and simulation campaigns
//! - Acquiring traces on the simulated bench (downsampled and cropped)
//! - Simulating targets to produce model-annotated execution traces
//! - Building aligned datasets from acquisition/simulation pairs
//! - Evaluating leakage (TVLA t-test, correlation key recovery)
//!
//! Real hardware acquisition runs through the same commands once a driver
//! implementing the oscilloscope interface is plugged in.

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use sidetrace_core::align::{Aligner, CycleAggregation};
use sidetrace_core::encoder::FeatureSchema;
use sidetrace_core::evaluation::{
    correlation_bruteforce_key_byte, count_leaky_samples, ttest_from_accumulators,
    WelchAccumulator, TVLA_THRESHOLD,
};
use sidetrace_core::exec_trace::ExecutionTrace;
use sidetrace_core::model::{HammingWeightModel, Model};
use sidetrace_core::processing::{
    crop_cycles, downsample_per_cycle, find_cycles, ClockFinder,
};
use sidetrace_core::Trace;
use sidetrace_sim::{
    sbox_output, BenchConfig, Board, Cipher, Emulator, PipelineEmulator, SimulatedBench,
};

#[derive(Parser)]
#[command(name = "sidetrace")]
#[command(author, version, about = "Side-channel power-analysis toolkit", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate input texts for acquisition and simulation
    GenInput {
        /// Cipher (tinyaes, byte-masked-aes, xoodoo, generated-code)
        #[arg(short, long, default_value = "tinyaes")]
        cipher: String,

        /// Number of input texts
        #[arg(short, long, default_value = "1")]
        num: usize,

        /// Fixed key as hex (random per input if not given)
        #[arg(short, long)]
        key: Option<String>,

        /// RNG seed for reproducible campaigns
        #[arg(long)]
        seed: Option<u64>,

        /// Output file, one hex line per input (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Acquire traces on the simulated bench
    Acquire {
        /// Cipher to run
        #[arg(short, long, default_value = "tinyaes")]
        cipher: String,

        /// Board name used in output file names
        #[arg(short, long, default_value = "disco_f051r8")]
        board: String,

        /// Number of traces (ignored when --input is given)
        #[arg(short, long, default_value = "1")]
        num: usize,

        /// Acquisitions averaged per input text
        #[arg(long, default_value = "50")]
        average: usize,

        /// Text file with input hex lines (random inputs if not specified)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Disable per-cycle downsampling
        #[arg(long)]
        no_downsample: bool,

        /// Disable cropping of NOP padding
        #[arg(long)]
        no_crop: bool,

        /// Crop threshold on the downsampled trace
        #[arg(long, default_value = "1.5")]
        threshold: f64,

        /// Bench noise standard deviation
        #[arg(long, default_value = "0.05")]
        noise: f64,

        /// Bench oscilloscope samples per clock cycle
        #[arg(long, default_value = "25")]
        samples_per_cycle: usize,

        /// Bench RNG seed
        #[arg(long)]
        seed: Option<u64>,

        /// Destination folder for saved traces
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Simulate the target and write model-annotated execution traces
    Simulate {
        /// Cipher to run
        #[arg(short, long, default_value = "tinyaes")]
        cipher: String,

        /// Board name used in output file names
        #[arg(short, long, default_value = "disco_f051r8")]
        board: String,

        /// Number of traces (ignored when --input is given)
        #[arg(short, long, default_value = "1")]
        num: usize,

        /// Text file with input hex lines (random inputs if not specified)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Disable cropping of NOP padding
        #[arg(long)]
        no_crop: bool,

        /// Write only the power column as a binary trace
        #[arg(long)]
        only_power: bool,

        /// RNG seed for random inputs
        #[arg(long)]
        seed: Option<u64>,

        /// Destination folder for saved traces
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Align acquisition/simulation pairs into a dataset
    BuildDataset {
        /// Folder containing acquisition traces (.bin)
        #[arg(long = "input-acquisition", short = 'a')]
        input_acquisition: PathBuf,

        /// Folder containing simulation execution traces (.csv)
        #[arg(long = "input-simulation", short = 's')]
        input_simulation: PathBuf,

        /// Slanted-band half-width for the DTW alignment
        #[arg(long, default_value = "10")]
        window: usize,

        /// Per-instruction power aggregation (first, mean, max)
        #[arg(long, default_value = "first")]
        aggregation: String,

        /// Worker threads (0 = one per core)
        #[arg(short, long, default_value = "0")]
        jobs: usize,

        /// Destination folder for aligned datasets
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Welch t-test between two trace folders (TVLA)
    Tvla {
        /// Folder containing the first set of traces
        #[arg(long = "set1", short = '1')]
        set1: PathBuf,

        /// Folder containing the second set of traces
        #[arg(long = "set2", short = '2')]
        set2: PathBuf,

        /// Leakage threshold on |t|
        #[arg(long, default_value_t = TVLA_THRESHOLD)]
        threshold: f64,

        /// Write the per-sample statistic as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Recover the clock frequency and phase of a trace
    Clock {
        /// Input trace file
        #[arg(short, long)]
        input: PathBuf,

        /// Estimated clock frequency in Hz
        #[arg(long, default_value = "8000000")]
        estimate: f64,

        /// Accepted deviation from the estimate in Hz
        #[arg(long, default_value = "1000")]
        precision: f64,

        /// Spectral magnitude threshold
        #[arg(long, default_value = "0.0002")]
        threshold: f64,

        /// Sample rate in Hz
        #[arg(long, default_value = "250000000")]
        sample_rate: f64,
    },

    /// Crop the quiet padding of a trace
    Crop {
        /// Input trace file
        #[arg(short, long)]
        input: PathBuf,

        /// Output trace file
        #[arg(short, long)]
        output: PathBuf,

        /// Quiet amplitude threshold
        #[arg(long, default_value = "0.005")]
        threshold: f64,

        /// Samples per clock cycle
        #[arg(long, default_value = "1")]
        samples_per_cycle: usize,
    },

    /// Correlation key-byte recovery over acquired traces
    Attack {
        /// Folder containing cropped traces named `board_cipher_inputhex.bin`
        #[arg(short, long)]
        traces: PathBuf,

        /// Sample index of the leakage point inside each trace
        #[arg(short, long)]
        index: usize,

        /// Key byte position under attack
        #[arg(short, long, default_value = "0")]
        byte: usize,

        /// Cipher the traces were acquired from
        #[arg(short, long, default_value = "tinyaes")]
        cipher: String,

        /// Number of ranked candidates to print
        #[arg(long, default_value = "5")]
        top: usize,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_cipher(name: &str) -> Result<Cipher> {
    Cipher::parse(name).ok_or_else(|| {
        anyhow::anyhow!(
            "Unknown cipher: {}. Use tinyaes, byte-masked-aes, xoodoo, or generated-code",
            name
        )
    })
}

fn parse_board(name: &str) -> Result<Board> {
    Board::parse(name).ok_or_else(|| {
        anyhow::anyhow!(
            "Unknown board: {}. Use disco_f051r8, disco_f100rb, bbcmicrobit, or native",
            name
        )
    })
}

fn parse_aggregation(name: &str) -> Result<CycleAggregation> {
    match name.to_lowercase().as_str() {
        "first" => Ok(CycleAggregation::First),
        "mean" => Ok(CycleAggregation::Mean),
        "max" => Ok(CycleAggregation::Max),
        _ => bail!("Unknown aggregation: {}. Use first, mean, or max", name),
    }
}

fn parse_hex(text: &str) -> Result<Vec<u8>> {
    let text = text.trim();
    if text.len() % 2 != 0 {
        bail!("Odd-length hex string: {}", text);
    }
    (0..text.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&text[i..i + 2], 16)
                .with_context(|| format!("Invalid hex: {}", &text[i..i + 2]))
        })
        .collect()
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn write_trace_f64(trace: &[f64], path: &Path) -> Result<()> {
    use byteorder::{LittleEndian, WriteBytesExt};

    let file = File::create(path).context("Failed to create output file")?;
    let mut writer = BufWriter::new(file);

    for &sample in trace {
        writer.write_f64::<LittleEndian>(sample)?;
    }

    writer.flush()?;
    Ok(())
}

fn read_trace_f64(path: &Path) -> Result<Trace> {
    use byteorder::{LittleEndian, ReadBytesExt};

    let file = File::open(path)
        .with_context(|| format!("Failed to open trace file {path:?}"))?;
    let metadata = file.metadata()?;
    let num_samples = metadata.len() as usize / 8;

    let mut reader = BufReader::new(file);
    let mut trace = Vec::with_capacity(num_samples);
    for _ in 0..num_samples {
        trace.push(reader.read_f64::<LittleEndian>()?);
    }

    Ok(trace)
}

/// Sorted files with the given extension in a folder.
fn collect_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read folder {dir:?}"))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().map(|e| e == extension).unwrap_or(false))
        .collect();
    files.sort();
    Ok(files)
}

/// Read input texts: one hex line per input.
fn read_input_lines(path: &Path) -> Result<Vec<Vec<u8>>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open input file {path:?}"))?;
    BufReader::new(file)
        .lines()
        .filter(|l| l.as_ref().map(|l| !l.trim().is_empty()).unwrap_or(true))
        .map(|line| parse_hex(&line?))
        .collect()
}

/// Input texts for a campaign: either from a hex-line file or freshly
/// generated.
fn campaign_inputs(
    cipher: Cipher,
    input: Option<&Path>,
    num: usize,
    seed: Option<u64>,
) -> Result<Vec<Vec<u8>>> {
    let inputs = match input {
        Some(path) => {
            let inputs = read_input_lines(path)?;
            for (i, text) in inputs.iter().enumerate() {
                cipher.check_input(text).with_context(|| {
                    format!("Input {} in {path:?} does not match {cipher}", i + 1)
                })?;
            }
            inputs
        }
        None => {
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            (0..num)
                .map(|_| cipher.generate_input(&mut rng, None))
                .collect::<Result<_, _>>()?
        }
    };
    Ok(inputs)
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{bar:40.cyan/blue} {pos}/{len} [{elapsed_precise}] {msg}",
        )
        .expect("static template"),
    );
    pb
}

fn cmd_gen_input(
    cipher: String,
    num: usize,
    key: Option<String>,
    seed: Option<u64>,
    output: Option<PathBuf>,
) -> Result<()> {
    let cipher = parse_cipher(&cipher)?;
    let key = key.map(|k| parse_hex(&k)).transpose()?;
    if let Some(ref key) = key {
        if key.len() != cipher.key_length() {
            bail!(
                "Key must be {} bytes for {}, got {}",
                cipher.key_length(),
                cipher,
                key.len()
            );
        }
    }

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut lines = String::new();
    for _ in 0..num {
        let input = cipher.generate_input(&mut rng, key.as_deref())?;
        lines.push_str(&to_hex(&input));
        lines.push('\n');
    }

    match output {
        Some(path) => {
            std::fs::write(&path, lines)
                .with_context(|| format!("Failed to write {path:?}"))?;
            info!("Wrote {} input texts to {:?}", num, path);
        }
        None => print!("{lines}"),
    }
    Ok(())
}

fn cmd_acquire(args: AcquireArgs) -> Result<()> {
    let cipher = parse_cipher(&args.cipher)?;
    let board = parse_board(&args.board)?;
    std::fs::create_dir_all(&args.output)?;

    let config = BenchConfig {
        samples_per_cycle: args.samples_per_cycle,
        noise_std: args.noise,
        seed: args.seed,
        ..Default::default()
    };
    let mut bench = SimulatedBench::new(PipelineEmulator::new(cipher), config);
    info!(
        "Acquiring {} on {} at {:.0} MS/s",
        cipher,
        board,
        config.sample_rate() / 1e6
    );

    let inputs =
        campaign_inputs(cipher, args.input.as_deref(), args.num, args.seed)?;

    let pb = progress_bar(inputs.len());
    let mut failed = 0usize;
    for input in &inputs {
        pb.inc(1);

        let output = args
            .output
            .join(format!("{board}_{cipher}_{}.bin", to_hex(input)));
        if output.is_file() {
            debug!("Skipping existing {:?}", output);
            continue;
        }

        let result = (|| -> Result<()> {
            let (_, trace, clock) = bench.run_and_acquire(input, args.average)?;

            let trace = if !args.no_downsample {
                // Keep the max of each cycle
                let cycles =
                    find_cycles(&clock, config.clock_freq, config.sample_rate());
                downsample_per_cycle(&trace, &cycles)?
            } else {
                trace
            };

            let trace = if !args.no_crop {
                crop_cycles(&trace, args.threshold, 1)?
            } else {
                trace
            };

            write_trace_f64(&trace, &output)
        })();

        if let Err(e) = result {
            warn!("Acquisition failed for input {}: {e:#}", to_hex(input));
            failed += 1;
        }
    }
    pb.finish_and_clear();

    info!("Acquired {}/{} traces", inputs.len() - failed, inputs.len());
    Ok(())
}

fn cmd_simulate(args: SimulateArgs) -> Result<()> {
    let cipher = parse_cipher(&args.cipher)?;
    let board = parse_board(&args.board)?;
    std::fs::create_dir_all(&args.output)?;

    let mut emulator = PipelineEmulator::new(cipher);
    let model = HammingWeightModel::new();
    let schema = FeatureSchema::new();

    let inputs =
        campaign_inputs(cipher, args.input.as_deref(), args.num, args.seed)?;
    info!("Simulating {} inputs for {} on {}", inputs.len(), cipher, board);

    let pb = progress_bar(inputs.len());
    let mut failed = 0usize;
    for input in &inputs {
        pb.inc(1);

        let extension = if args.only_power { "bin" } else { "csv" };
        let output = args
            .output
            .join(format!("{board}_{cipher}_{}.{extension}", to_hex(input)));
        if output.is_file() {
            debug!("Skipping existing {:?}", output);
            continue;
        }

        let result = (|| -> Result<()> {
            let (_, trace) = emulator.run(input)?;
            let mut trace = if args.no_crop { trace } else { trace.crop_nop()? };

            let features = schema.encode(&trace);
            let predicted = model.predict(&features)?;
            for (record, power) in trace.records_mut().iter_mut().zip(&predicted) {
                record.power = Some(*power);
            }

            if args.only_power {
                write_trace_f64(&trace.power_trace()?, &output)
            } else {
                trace.write_csv_file(&output)?;
                Ok(())
            }
        })();

        if let Err(e) = result {
            warn!("Simulation failed for input {}: {e:#}", to_hex(input));
            failed += 1;
        }
    }
    pb.finish_and_clear();

    info!("Simulated {}/{} traces", inputs.len() - failed, inputs.len());
    Ok(())
}

fn cmd_build_dataset(args: BuildDatasetArgs) -> Result<()> {
    let aggregation = parse_aggregation(&args.aggregation)?;
    std::fs::create_dir_all(&args.output)?;

    if args.jobs > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.jobs)
            .build_global()
            .context("Failed to size the worker pool")?;
    }

    // Pair acquisition and simulation files by stem
    let simulations = collect_files(&args.input_simulation, "csv")?;
    let mut pairs: Vec<(PathBuf, PathBuf, PathBuf)> = Vec::new();
    for sim in &simulations {
        let stem = sim
            .file_stem()
            .and_then(|s| s.to_str())
            .context("Simulation file has no stem")?;
        let acq = args.input_acquisition.join(format!("{stem}.bin"));
        if !acq.is_file() {
            warn!("No acquisition for {:?}, skipping", sim);
            continue;
        }
        let out = args.output.join(format!("{stem}.csv"));
        pairs.push((acq, sim.clone(), out));
    }
    if pairs.is_empty() {
        bail!("No acquisition/simulation pairs found");
    }
    info!("Aligning {} file pairs", pairs.len());

    let aligner = Aligner::new()
        .with_window(args.window)
        .with_aggregation(aggregation);

    // One task per file pair, no shared state, failures logged and skipped
    let pb = progress_bar(pairs.len());
    let aligned: usize = pairs
        .par_iter()
        .map(|(acq_path, sim_path, out_path)| {
            let result = align_pair(&aligner, acq_path, sim_path, out_path);
            pb.inc(1);
            match result {
                Ok(dropped) => {
                    if dropped > 0 {
                        warn!(
                            "{:?}: {} instructions dropped by the alignment",
                            out_path, dropped
                        );
                    }
                    1
                }
                Err(e) => {
                    warn!("Alignment failed for {acq_path:?} / {sim_path:?}: {e:#}");
                    0
                }
            }
        })
        .sum();
    pb.finish_and_clear();

    info!("Aligned {}/{} pairs into {:?}", aligned, pairs.len(), args.output);
    Ok(())
}

fn align_pair(
    aligner: &Aligner,
    acq_path: &Path,
    sim_path: &Path,
    out_path: &Path,
) -> Result<usize> {
    let acquisition = read_trace_f64(acq_path)?;
    let simulation = ExecutionTrace::read_csv_file(sim_path)?;

    let summary = aligner.align(&acquisition, &simulation)?;
    debug!(
        "{:?}: normalized distance {:.6}",
        out_path, summary.normalized_distance
    );

    summary.annotated.write_csv_file(out_path)?;
    Ok(summary.dropped)
}

fn cmd_tvla(
    set1: PathBuf,
    set2: PathBuf,
    threshold: f64,
    output: Option<PathBuf>,
) -> Result<()> {
    let files1 = collect_files(&set1, "bin")?;
    let files2 = collect_files(&set2, "bin")?;
    if files1.is_empty() || files2.is_empty() {
        bail!("Both sets need at least one trace");
    }

    // Crop all traces to the shortest; lengths come from file sizes so the
    // sets stream through without living in memory together
    let min_len = files1
        .iter()
        .chain(&files2)
        .map(|p| Ok(std::fs::metadata(p)?.len() as usize / 8))
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .min()
        .unwrap_or(0);
    if min_len == 0 {
        bail!("Empty trace in input sets");
    }

    let accumulate = |files: &[PathBuf]| -> Result<WelchAccumulator> {
        let mut acc = WelchAccumulator::new();
        for path in files {
            let mut trace = read_trace_f64(path)?;
            trace.truncate(min_len);
            acc.add(&trace)?;
        }
        Ok(acc)
    };
    let acc1 = accumulate(&files1)?;
    let acc2 = accumulate(&files2)?;

    let stats = ttest_from_accumulators(&acc1, &acc2)?;
    let leaky = count_leaky_samples(&stats, threshold);

    println!(
        "Leaky points (>{}): {} / {}, {:.2}%",
        threshold,
        leaky,
        stats.len(),
        leaky as f64 / stats.len() as f64 * 100.0
    );
    info!(
        "{} traces vs {} traces, {} samples",
        acc1.count(),
        acc2.count(),
        min_len
    );

    if let Some(path) = output {
        let mut writer = BufWriter::new(
            File::create(&path).with_context(|| format!("Failed to create {path:?}"))?,
        );
        writeln!(writer, "sample,t")?;
        for (i, t) in stats.iter().enumerate() {
            writeln!(writer, "{i},{t}")?;
        }
        writer.flush()?;
        info!("Wrote statistic to {:?}", path);
    }

    Ok(())
}

fn cmd_clock(
    input: PathBuf,
    estimate: f64,
    precision: f64,
    threshold: f64,
    sample_rate: f64,
) -> Result<()> {
    let trace = read_trace_f64(&input)?;
    info!("Read {} samples from {:?}", trace.len(), input);

    let clock = ClockFinder::new(sample_rate)
        .with_estimate(estimate)
        .with_precision(precision)
        .with_threshold(threshold)
        .find(&trace)?;

    println!("Clock frequency: {:.3} Hz", clock.frequency);
    println!("Clock phase:     {:.3}°", clock.phase_degrees);
    Ok(())
}

fn cmd_crop(
    input: PathBuf,
    output: PathBuf,
    threshold: f64,
    samples_per_cycle: usize,
) -> Result<()> {
    let trace = read_trace_f64(&input)?;
    let cropped = crop_cycles(&trace, threshold, samples_per_cycle)?;

    info!("Cropped {} samples to {}", trace.len(), cropped.len());
    write_trace_f64(&cropped, &output)?;
    info!("Wrote cropped trace to {:?}", output);
    Ok(())
}

fn cmd_attack(
    traces: PathBuf,
    index: usize,
    byte: usize,
    cipher: String,
    top: usize,
) -> Result<()> {
    let cipher = parse_cipher(&cipher)?;
    if byte >= cipher.msg_length() {
        bail!(
            "Byte position {} out of range for {} ({} message bytes)",
            byte,
            cipher,
            cipher.msg_length()
        );
    }

    let files = collect_files(&traces, "bin")?;
    if files.is_empty() {
        bail!("No traces found in {:?}", traces);
    }

    // Trace files are named `board_cipher_inputhex.bin`; the input text
    // comes back out of the file name
    let mut samples = Vec::with_capacity(files.len());
    let mut plaintexts = Vec::with_capacity(files.len());
    for path in &files {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .with_context(|| format!("Bad trace file name {path:?}"))?;
        let hex = stem
            .rsplit('_')
            .next()
            .with_context(|| format!("No input text in file name {path:?}"))?;
        let input = parse_hex(hex)?;
        cipher
            .check_input(&input)
            .with_context(|| format!("File name input text mismatch for {path:?}"))?;

        let trace = read_trace_f64(path)?;
        if index >= trace.len() {
            bail!(
                "Leakage index {} out of range for {:?} ({} samples)",
                index,
                path,
                trace.len()
            );
        }

        samples.push(trace[index]);
        plaintexts.push(input[cipher.msg_offset() + byte]);
    }
    info!("Attacking key byte {} over {} traces", byte, samples.len());

    let corr = correlation_bruteforce_key_byte(&samples, &plaintexts, |&p, k| {
        sbox_output(p, k) as u32
    })?;

    let mut ranked: Vec<(usize, f64)> =
        corr.iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| {
        b.1.abs()
            .partial_cmp(&a.1.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    println!("Key byte {byte} candidates by |correlation|:");
    for (rank, (key, r)) in ranked.iter().take(top).enumerate() {
        println!("  {:>2}. 0x{key:02x}  r = {r:+.6}", rank + 1);
    }
    println!("Best guess: 0x{:02x}", ranked[0].0);
    Ok(())
}

struct AcquireArgs {
    cipher: String,
    board: String,
    num: usize,
    average: usize,
    input: Option<PathBuf>,
    no_downsample: bool,
    no_crop: bool,
    threshold: f64,
    noise: f64,
    samples_per_cycle: usize,
    seed: Option<u64>,
    output: PathBuf,
}

struct SimulateArgs {
    cipher: String,
    board: String,
    num: usize,
    input: Option<PathBuf>,
    no_crop: bool,
    only_power: bool,
    seed: Option<u64>,
    output: PathBuf,
}

struct BuildDatasetArgs {
    input_acquisition: PathBuf,
    input_simulation: PathBuf,
    window: usize,
    aggregation: String,
    jobs: usize,
    output: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    match cli.command {
        Commands::GenInput {
            cipher,
            num,
            key,
            seed,
            output,
        } => cmd_gen_input(cipher, num, key, seed, output),

        Commands::Acquire {
            cipher,
            board,
            num,
            average,
            input,
            no_downsample,
            no_crop,
            threshold,
            noise,
            samples_per_cycle,
            seed,
            output,
        } => cmd_acquire(AcquireArgs {
            cipher,
            board,
            num,
            average,
            input,
            no_downsample,
            no_crop,
            threshold,
            noise,
            samples_per_cycle,
            seed,
            output,
        }),

        Commands::Simulate {
            cipher,
            board,
            num,
            input,
            no_crop,
            only_power,
            seed,
            output,
        } => cmd_simulate(SimulateArgs {
            cipher,
            board,
            num,
            input,
            no_crop,
            only_power,
            seed,
            output,
        }),

        Commands::BuildDataset {
            input_acquisition,
            input_simulation,
            window,
            aggregation,
            jobs,
            output,
        } => cmd_build_dataset(BuildDatasetArgs {
            input_acquisition,
            input_simulation,
            window,
            aggregation,
            jobs,
            output,
        }),

        Commands::Tvla {
            set1,
            set2,
            threshold,
            output,
        } => cmd_tvla(set1, set2, threshold, output),

        Commands::Clock {
            input,
            estimate,
            precision,
            threshold,
            sample_rate,
        } => cmd_clock(input, estimate, precision, threshold, sample_rate),

        Commands::Crop {
            input,
            output,
            threshold,
            samples_per_cycle,
        } => cmd_crop(input, output, threshold, samples_per_cycle),

        Commands::Attack {
            traces,
            index,
            byte,
            cipher,
            top,
        } => cmd_attack(traces, index, byte, cipher, top),

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let bin_name = cmd.get_name().to_string();
            generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
            Ok(())
        }
    }
}
