use clap::Parser;
use log::{debug, error, info, LevelFilter};
use rust_python_subset_support::io::{read_reference_tree, read_replicate_file, write_tree};
use rust_python_subset_support::{recalculate_for_subset, NewickFormat, TaxonSelector};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use std::path::PathBuf;
use std::time::Instant;

/// Prune a phylogenetic tree to the taxa matching a pattern and recalculate
/// its bootstrap support from the (equally pruned) bootstrap trees.
/// The resulting tree is written as Newick to stdout or `--output`.
#[derive(Parser, Debug)]
#[command(
    name = "subset-support",
    version,
    about = "Prunes the tree and recalculates the bootstrap values"
)]
struct Args {
    /// The phylogenetic tree (Newick file or inline Newick string)
    tree: String,

    /// File with the corresponding bootstrap trees, one per line (.gz allowed)
    bootstrap_trees: PathBuf,

    /// Regular expression selecting the taxa to keep (matched at the start of the name)
    taxa: String,

    /// Output path for the pruned tree (`-` or absent: stdout, `.gz`: compressed)
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Round recalculated support values to this many decimals
    #[arg(long = "support-decimals")]
    support_decimals: Option<usize>,

    /// Quiet mode: only warnings and errors on stderr
    #[arg(short = 'q', long = "quiet", default_value_t = false, conflicts_with = "verbose")]
    quiet: bool,

    /// Report the old and new support of every internal node
    #[arg(short = 'v', long = "verbose", default_value_t = false)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    initialise_logging(&args);

    if let Err(e) = run(&args) {
        error!("{e}");
        std::process::exit(e.exit_code());
    }
}

fn initialise_logging(args: &Args) {
    let level = match (args.quiet, args.verbose) {
        (true, _) => LevelFilter::Warn,
        (_, true) => LevelFilter::Debug,
        _ => LevelFilter::Info,
    };
    // stdout carries the tree, so log to stderr only
    let config = Config::default();
    if TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto).is_err() {
        eprintln!("Logging could not be initialised");
    }
}

fn run(args: &Args) -> rust_python_subset_support::Result<()> {
    let selector = TaxonSelector::new(&args.taxa)?;

    let t0 = Instant::now();
    info!("Loading the primary tree.");
    let reference = read_reference_tree(&args.tree)?;
    let all_taxa = reference.leaf_names();
    info!("Read {} taxa in {:.3}s", all_taxa.len(), t0.elapsed().as_secs_f64());

    let selected = selector.select(all_taxa.iter().map(String::as_str));
    info!("The following {} leaf nodes match '{}':", selected.len(), selector.pattern());
    for leaf in &selected {
        info!("{leaf}");
    }

    let t1 = Instant::now();
    info!("Loading the bootstrap trees from {:?}.", args.bootstrap_trees);
    let replicates = read_replicate_file(&args.bootstrap_trees)?;
    info!(
        "Loaded {} bootstrap trees in {:.3}s",
        replicates.len(),
        t1.elapsed().as_secs_f64()
    );

    let t2 = Instant::now();
    let result = recalculate_for_subset(reference, replicates, &selected)?;
    info!(
        "Pruned and recalculated support for {} internal nodes in {:.3}s",
        result.changes.len(),
        t2.elapsed().as_secs_f64()
    );
    for change in &result.changes {
        match change.previous {
            Some(previous) => debug!(
                "Support for internal node {} was {previous}, now is {}",
                change.node, change.support
            ),
            None => debug!("Support for internal node {} is now {}", change.node, change.support),
        }
    }

    let format = NewickFormat {
        support_decimals: args.support_decimals,
    };
    match &args.output {
        Some(path) => info!("Writing new bootstrapped tree to {path:?}."),
        None => info!("Writing new bootstrapped tree to STDOUT."),
    }
    write_tree(args.output.as_ref(), &result.tree, &format)?;
    Ok(())
}
