use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use adaptive_practice::{
    Candidate, ScenePreference, ThemeScene, ThemeWeights, WordEvidence, WordKnowledge,
    article_difficulty, predict_article, profile_from_evidence, recommend, recommend_for_band,
    select_next, update,
};
use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use language_utils::{
    Language, LexicalProfile, PracticeSession, TargetBand, UserAbilityState,
};
use lexical_analysis::{
    AnalysisContext, AnalysisOptions, DictionarySource, EngineConfig, GrammarTable,
    TokenizerBackend,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Grade texts by vocabulary and grammar level, and drive adaptive practice
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Engine config JSON. Falls back to $LEX_ENGINE_CONFIG, then built-in defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a lexical profile per text file (JSON lines). Reads stdin without files
    Analyze {
        #[arg(short, long, value_parser = parse_language)]
        language: Language,
        #[arg(long)]
        backend: Option<TokenizerBackend>,
        #[arg(long)]
        dictionary: Option<DictionarySource>,
        #[arg(long)]
        grammar_table: Option<GrammarTable>,
        files: Vec<PathBuf>,
    },
    /// Predict which words of a text a learner does not know
    Predict {
        #[arg(short, long, value_parser = parse_language)]
        language: Language,
        /// Learner's native language
        #[arg(long, value_parser = parse_language)]
        native: Option<Language>,
        /// JSON `{"evidence": {word: ...}, "frequency_ranks": {word: rank}}`
        #[arg(long)]
        evidence: Option<PathBuf>,
        file: PathBuf,
    },
    /// Build a mastery profile from a JSON array of per-word records
    Profile { words: PathBuf },
    /// Fold a practice session into an ability state
    Update {
        /// Current state. A new learner's defaults when omitted
        #[arg(long)]
        state: Option<PathBuf>,
        #[arg(long)]
        session: PathBuf,
        /// Token count of the practiced item; 0 skips the new-word signals
        #[arg(long, default_value_t = 0)]
        total_tokens: usize,
    },
    /// Rank candidates within a recommendation band
    Recommend {
        #[arg(long)]
        state: Option<PathBuf>,
        #[arg(long)]
        candidates: PathBuf,
        #[arg(short, long, value_parser = parse_language)]
        language: Language,
        /// Drawn from the state's explore ratios when omitted
        #[arg(long)]
        band: Option<TargetBand>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Pick the item to practice after the current one
    Next {
        #[arg(long)]
        state: Option<PathBuf>,
        #[arg(long)]
        candidates: PathBuf,
        #[arg(short, long, value_parser = parse_language)]
        language: Language,
        /// Defaults to the state's level
        #[arg(long)]
        target_level: Option<f64>,
        #[arg(long)]
        current: Option<String>,
        /// JSON array of the user's scene preferences
        #[arg(long)]
        scenes: Option<PathBuf>,
        /// JSON array of theme scene vectors
        #[arg(long)]
        theme_scenes: Option<PathBuf>,
    },
    /// Print the JSON schema of a record
    Schema { record: SchemaRecord },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SchemaRecord {
    Config,
    Profile,
    State,
    Session,
    Candidate,
}

#[derive(Serialize)]
struct AnalyzedFile {
    path: Option<PathBuf>,
    profile: LexicalProfile,
}

#[derive(serde::Deserialize, Default)]
struct EvidenceFile {
    #[serde(default)]
    evidence: HashMap<String, WordEvidence>,
    #[serde(default)]
    frequency_ranks: HashMap<String, u32>,
}

fn parse_language(code: &str) -> Result<Language, String> {
    Language::from_code(code).ok_or_else(|| format!("unknown language code: {code}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    match args.command {
        Command::Analyze {
            language,
            backend,
            dictionary,
            grammar_table,
            files,
        } => {
            let context = AnalysisContext::new(load_config(args.config)?);
            let options = AnalysisOptions {
                backend,
                dictionary,
                grammar_table,
            };
            analyze_files(&context, language, options, files).await?;
        }
        Command::Predict {
            language,
            native,
            evidence,
            file,
        } => {
            let context = AnalysisContext::new(load_config(args.config)?);
            let text = read_text(&file)?;
            let profile = context
                .analyze(&text, language, AnalysisOptions::default())
                .await;
            let evidence: EvidenceFile = match evidence {
                Some(path) => read_json(&path)?,
                None => EvidenceFile::default(),
            };
            let prediction = predict_article(
                &profile.tokens,
                native,
                &evidence.evidence,
                &evidence.frequency_ranks,
                chrono::Utc::now(),
            );
            let grammar_level = profile.grammar.as_ref().and_then(|g| g.hardest_level());
            let difficulty = article_difficulty(&prediction, grammar_level);
            print_json(&serde_json::json!({
                "prediction": prediction,
                "difficulty": difficulty,
            }))?;
        }
        Command::Profile { words } => {
            let rows: Vec<WordKnowledge> = read_json(&words)?;
            print_json(&profile_from_evidence(&rows))?;
        }
        Command::Update {
            state,
            session,
            total_tokens,
        } => {
            let state = read_state(state.as_deref())?;
            let session: PracticeSession = read_json(&session)?;
            print_json(&update(&state, &session, total_tokens))?;
        }
        Command::Recommend {
            state,
            candidates,
            language,
            band,
            seed,
        } => {
            let state = read_state(state.as_deref())?;
            let candidates: Vec<Candidate> = read_json(&candidates)?;
            let recommendation = match band {
                Some(band) => recommend_for_band(&state, &candidates, language, band),
                None => {
                    let mut rng = match seed {
                        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
                        None => ChaCha8Rng::from_os_rng(),
                    };
                    recommend(&state, &candidates, language, &mut rng)
                }
            };
            print_json(&recommendation)?;
        }
        Command::Next {
            state,
            candidates,
            language,
            target_level,
            current,
            scenes,
            theme_scenes,
        } => {
            let state = read_state(state.as_deref())?;
            let candidates: Vec<Candidate> = read_json(&candidates)?;
            let scenes: Vec<ScenePreference> = match scenes {
                Some(path) => read_json(&path)?,
                None => Vec::new(),
            };
            let theme_scenes: Vec<ThemeScene> = match theme_scenes {
                Some(path) => read_json(&path)?,
                None => Vec::new(),
            };
            let weights = ThemeWeights::from_scenes(&scenes, &theme_scenes);
            let suggestion = select_next(
                current.as_deref(),
                &candidates,
                &weights,
                target_level.unwrap_or(state.level),
                language,
                &state.unknown_rate_by_band,
            );
            match suggestion {
                Some(suggestion) => print_json(&suggestion)?,
                None => log::warn!("No candidate left to suggest"),
            }
        }
        Command::Schema { record } => {
            let schema = match record {
                SchemaRecord::Config => schemars::schema_for!(EngineConfig),
                SchemaRecord::Profile => schemars::schema_for!(LexicalProfile),
                SchemaRecord::State => schemars::schema_for!(UserAbilityState),
                SchemaRecord::Session => schemars::schema_for!(PracticeSession),
                SchemaRecord::Candidate => schemars::schema_for!(Candidate),
            };
            print_json(&schema)?;
        }
    }
    Ok(())
}

async fn analyze_files(
    context: &AnalysisContext,
    language: Language,
    options: AnalysisOptions,
    files: Vec<PathBuf>,
) -> anyhow::Result<()> {
    if files.is_empty() {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        let profile = context.analyze(&text, language, options).await;
        return print_line(&AnalyzedFile {
            path: None,
            profile,
        });
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} texts ({eta})")?
            .progress_chars("#>-"),
    );

    let mut results = futures::stream::iter(files.into_iter().map(|path| {
        let pb = pb.clone();
        async move {
            let result = match read_text(&path) {
                Ok(text) => Ok(context.analyze(&text, language, options).await),
                Err(e) => Err(e),
            };
            pb.inc(1);
            (path, result)
        }
    }))
    .buffered(8);

    while let Some((path, result)) = results.next().await {
        match result {
            Ok(profile) => {
                pb.suspend(|| {
                    print_line(&AnalyzedFile {
                        path: Some(path),
                        profile,
                    })
                })?;
            }
            Err(e) => log::error!("{e:#}"),
        }
    }
    pb.finish_and_clear();
    Ok(())
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<EngineConfig> {
    let path = path.or_else(|| std::env::var_os("LEX_ENGINE_CONFIG").map(PathBuf::from));
    match path {
        Some(path) => EngineConfig::from_json_file(&path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => {
            log::info!("No config given, using defaults");
            Ok(EngineConfig::default())
        }
    }
}

fn read_state(path: Option<&Path>) -> anyhow::Result<UserAbilityState> {
    match path {
        Some(path) => read_json(path),
        None => Ok(UserAbilityState::default()),
    }
}

fn read_text(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let contents = read_text(path)?;
    serde_json::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_line<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}
