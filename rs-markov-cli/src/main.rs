use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;

use rs_markov_core::model::{Generator, Trainer};
use rs_markov_core::{ChainConfig, ModelStore};

/// Train chain models from corpora and generate messages from them.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
	/// JSON config file; defaults are used when it does not exist
	#[arg(long, global = true, default_value = "./config/chain_config.json")]
	config: PathBuf,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Train a model from scratch with `<corpus_dir>/<CORPUS>.txt`
	Train { corpus: String },

	/// Learn the lines of FILE into an existing model
	Update { model: String, file: PathBuf },

	/// Generate messages from a trained model
	Generate {
		model: String,

		/// Number of messages to generate
		#[arg(short, long, default_value_t = 1)]
		count: usize,

		/// Seed for reproducible output
		#[arg(short, long)]
		seed: Option<u64>,
	},

	/// List available corpora and trained models
	List,
}

fn trainer(config: &ChainConfig) -> Result<Trainer, Box<dyn std::error::Error>> {
	let mut trainer = Trainer::from_config(config);
	if let Some(path) = &config.initial_snapshot {
		trainer = trainer.with_initial(ModelStore::load_snapshot(path)?);
	}
	Ok(trainer)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
	env_logger::init();

	let cli = Cli::parse();
	log::debug!("Using config {}", cli.config.display());
	let config = ChainConfig::load_or_default(&cli.config)?;
	let store = ModelStore::from_config(&config);

	match cli.command {
		Command::Train { corpus } => {
			let lines = store.read_corpus(&corpus)?;
			let (model, processed) = trainer(&config)?.train(&lines);
			store.save(&model, &corpus)?;
			log::info!("Trained {corpus} with {processed} messages");
			println!("Trained {corpus} with {processed} messages ({} tokens)", model.node_count());
		}
		Command::Update { model: name, file } => {
			let mut model = store.load(&name)?;
			let processed = trainer(&config)?.update_from_file(&mut model, &file)?;
			store.save(&model, &name)?;
			log::info!("Updated {name} with {processed} messages from {}", file.display());
			println!("Studied {processed} new messages");
		}
		Command::Generate { model: name, count, seed } => {
			let model = store.load(&name)?;
			let generator = Generator::from_config(&config);
			log::info!("Generating {count} messages from {name}");
			let mut rng = match seed {
				Some(seed) => StdRng::seed_from_u64(seed),
				None => StdRng::from_rng(&mut rand::rng()),
			};
			for _ in 0..count {
				println!("{}", generator.generate_text(&model, &mut rng)?);
			}
		}
		Command::List => {
			println!("Corpora:");
			for name in store.list_corpora()? {
				println!("  {name}");
			}
			println!("Models:");
			for name in store.list_models()? {
				println!("  {name}");
			}
		}
	}

	Ok(())
}
