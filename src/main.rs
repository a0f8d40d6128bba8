use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use env_logger::{Builder, Env};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
mod auth;
use pixvault::codec::max_payload_len;
use pixvault::config::DEFAULT_MAX_PIXELS;
use pixvault::crypto::{Argon2Params, Kdf, NONCE_LEN, PBKDF2_ITERATIONS, SALT_LEN, TAG_LEN};
use pixvault::telemetry::LogSink;
use pixvault::worker::{self, ImageWorker};
use pixvault::{BlobFormat, Config, Limits, Pixvault, fsio, image_io};

#[derive(Debug, clap::Args)]
struct KdfArgs {
    /// Write a tagged blob that records its key derivation parameters
    #[arg(long)]
    tagged: bool,

    /// PBKDF2 iterations for a tagged blob (default: 100000)
    #[arg(long = "pbkdf2-iterations", conflicts_with_all = ["mem_cost_kib", "time_cost", "parallelism"])]
    iterations: Option<u32>,

    /// Use Argon2id with this memory cost in KiB (default: 65536); implies --tagged
    #[arg(long = "argon-mem")]
    mem_cost_kib: Option<u32>,

    /// Argon2id time cost / iterations (default: 3); implies --tagged
    #[arg(long = "argon-time")]
    time_cost: Option<u32>,

    /// Argon2id parallelism (default: 1); implies --tagged
    #[arg(long = "argon-parallelism")]
    parallelism: Option<u32>,
}

impl KdfArgs {
    fn uses_argon2(&self) -> bool {
        self.mem_cost_kib.is_some() || self.time_cost.is_some() || self.parallelism.is_some()
    }

    fn is_set(&self) -> bool {
        self.tagged || self.iterations.is_some() || self.uses_argon2()
    }

    fn to_blob_format(&self) -> Result<BlobFormat> {
        if self.uses_argon2() {
            let default = Argon2Params::default();
            let params = Argon2Params::new(
                self.mem_cost_kib.unwrap_or(default.mem_cost_kib()),
                self.time_cost.unwrap_or(default.time_cost()),
                self.parallelism.unwrap_or(default.parallelism()),
            )?;
            return Ok(BlobFormat::Tagged(Kdf::Argon2id(params)));
        }

        if self.tagged || self.iterations.is_some() {
            let kdf = Kdf::Pbkdf2 {
                iterations: self.iterations.unwrap_or(PBKDF2_ITERATIONS),
            };
            kdf.validate()?;
            return Ok(BlobFormat::Tagged(kdf));
        }

        Ok(BlobFormat::Legacy)
    }
}

#[derive(Debug, Parser)]
#[command(name = "pixvault")]
#[command(
    version,
    about = "Hide optionally encrypted messages in the pixels of lossless images."
)]
struct Cli {
    /// Refuse images with more pixels than this
    #[arg(long, global = true, value_name = "PIXELS", env = "PIXVAULT_MAX_PIXELS", default_value_t = DEFAULT_MAX_PIXELS)]
    max_pixels: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Hides a message in a cover image and writes the result as PNG
    #[command(arg_required_else_help = true)]
    Encode {
        /// Cover image (any supported format)
        #[arg(long, short, value_name = "PATH")]
        cover: PathBuf,

        /// Where to write the PNG carrying the message
        #[arg(long, short, value_name = "PATH")]
        output: PathBuf,

        /// Message text
        #[arg(long, short, required_unless_present = "message_file", conflicts_with = "message_file")]
        message: Option<String>,

        /// Read the message text from a file
        #[arg(long, value_name = "PATH")]
        message_file: Option<PathBuf>,

        /// Encrypt the message with a password before hiding it
        #[arg(long, short)]
        encrypt: bool,

        #[command(flatten)]
        kdf: KdfArgs,
    },

    /// Extracts a hidden message from an image
    #[command(arg_required_else_help = true)]
    Decode {
        /// Image carrying a message
        #[arg(long, short, value_name = "PATH")]
        input: PathBuf,

        /// Decrypt the extracted message with a password
        #[arg(long, short)]
        decrypt: bool,

        /// Write the message to a file instead of stdout
        #[arg(long, short, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Copy the message to the clipboard
        #[arg(long, default_value_t = false)]
        copy: bool,
    },

    /// Shows how many bytes an image can hold
    #[command(arg_required_else_help = true)]
    Capacity {
        #[arg(long, short, value_name = "PATH")]
        input: PathBuf,
    },

    /// Serves JSON encode/decode requests, one per line on stdin
    Worker,
}

/// `[HH:MM:SS] [LEVEL] message` on stderr, `warn` unless `RUST_LOG` says otherwise.
fn init_logger() {
    Builder::from_env(Env::default().default_filter_or("warn"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] [{}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logger();

    let args = Cli::parse();
    let limits = Limits::new(args.max_pixels);

    match args.command {
        Commands::Encode {
            cover,
            output,
            message,
            message_file,
            encrypt,
            kdf,
        } => {
            let message = match (message, message_file) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read message from {}", path.display()))?,
                (None, None) => bail!("no message given"),
            };
            if message.is_empty() {
                bail!("message cannot be empty");
            }

            if kdf.is_set() && !encrypt {
                bail!("key derivation options require --encrypt");
            }
            let config = Config {
                limits,
                format: kdf.to_blob_format()?,
            };

            let password = if encrypt {
                Some(auth::read_new_password()?)
            } else {
                None
            };

            let vault = Pixvault::new(config).with_sink(Arc::new(LogSink));
            let cover_bytes = fsio::read(&cover)?;
            let png = vault
                .hide_image(&cover_bytes, &message, password.as_ref().map(|p| p.as_str()))
                .context("failed to hide message")?;
            drop(password);

            fsio::write_atomic(&output, &png)?;
            println!("message encoded into '{}'", output.display());
        }
        Commands::Decode {
            input,
            decrypt,
            output,
            copy,
        } => {
            let password = if decrypt {
                Some(auth::read_password()?)
            } else {
                None
            };

            let vault = Pixvault::new(Config {
                limits,
                ..Config::default()
            })
            .with_sink(Arc::new(LogSink));

            let stego = fsio::read(&input)?;
            let revealed = vault
                .reveal_image(&stego, password.as_ref().map(|p| p.as_str()))
                .context("failed to reveal message")?;
            drop(password);

            if decrypt && !revealed.encrypted {
                eprintln!("warning: hidden data is too short to be encrypted; shown as plain text");
            }

            if copy {
                arboard::Clipboard::new()
                    .and_then(|mut clipboard| clipboard.set_text(revealed.text.clone()))
                    .context("failed to copy message to clipboard")?;
                eprintln!("message copied to clipboard");
            }

            match output {
                Some(path) => {
                    fsio::write_atomic(&path, revealed.text.as_bytes())?;
                    println!("message written to '{}'", path.display());
                }
                None if copy => {}
                None => println!("{}", revealed.text),
            }
        }
        Commands::Capacity { input } => {
            let bytes = fsio::read(&input)?;
            let (width, height) = image_io::read_dimensions(&bytes)?;
            let max = max_payload_len(width, height);
            let overhead = (SALT_LEN + NONCE_LEN + TAG_LEN) as i64;

            println!("dimensions: {width}x{height}");
            println!("max message: {} bytes", max.max(0));
            println!("max encrypted message: {} bytes", (max - overhead).max(0));

            if let Err(e) = limits.check(width, height) {
                println!("note: {e}");
            }
        }
        Commands::Worker => {
            let worker = ImageWorker::spawn(Arc::new(LogSink));
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            worker::serve(stdin, tokio::io::stdout(), &worker).await?;
        }
    }

    Ok(())
}
