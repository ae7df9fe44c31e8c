//! Thin demonstration CLI: `encode`/`decode` subcommands over PPM (P6) byte
//! dumps. Not a spec'd component — the wire format and compression engine
//! live in the library; this binary only wires them up for manual testing.

use std::fs;
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use twim::image::Image;
use twim::variant::Params;

#[derive(Parser)]
#[command(name = "twim", about = "A lossy image codec based on recursive polygon partitioning")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compress a PPM (P6) image into a twim byte stream.
    Encode {
        input: PathBuf,
        output: PathBuf,
        /// Target output size, in bytes.
        #[arg(long, default_value_t = 4096)]
        target_size: u32,
        /// Worker thread count for the variant search (default: all cores).
        #[arg(long)]
        threads: Option<usize>,
    },
    /// Decompress a twim byte stream back into a PPM (P6) image.
    Decode { input: PathBuf, output: PathBuf },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(err) = run(cli.command) {
        eprintln!("twim: {err}");
        std::process::exit(1);
    }
}

fn run(command: Command) -> io::Result<()> {
    match command {
        Command::Encode { input, output, target_size, threads } => {
            let image = read_ppm(&input)?;
            let mut params = Params::default_grid(target_size);
            if let Some(threads) = threads {
                params.num_threads = threads;
            }
            let bytes = twim::encode(&image, &params)
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err.to_string()))?;
            log::info!(
                "encoded {}x{} image into {} bytes (target was {target_size})",
                image.width,
                image.height,
                bytes.len(),
            );
            fs::write(&output, bytes)
        }
        Command::Decode { input, output } => {
            let bytes = fs::read(&input)?;
            let image = twim::decode(&bytes);
            if !image.ok() {
                return Err(io::Error::new(io::ErrorKind::InvalidData, "corrupt twim stream"));
            }
            write_ppm(&output, &image)
        }
    }
}

/// Reads a binary PPM (`P6`) file: a `P6\n<width> <height>\n255\n` header
/// (comment lines starting with `#` are skipped between tokens), followed by
/// `width * height` raw RGB triples.
fn read_ppm(path: &Path) -> io::Result<Image> {
    let file = fs::File::open(path)?;
    let mut reader = BufReader::new(file);

    let magic = read_token(&mut reader)?;
    if magic != "P6" {
        return Err(io::Error::new(io::ErrorKind::InvalidData, format!("unsupported PPM magic {magic:?}")));
    }
    let width: u32 = read_token(&mut reader)?
        .parse()
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "bad PPM width"))?;
    let height: u32 = read_token(&mut reader)?
        .parse()
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "bad PPM height"))?;
    let max_val: u32 = read_token(&mut reader)?
        .parse()
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "bad PPM maxval"))?;
    if max_val != 255 {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "only 8-bit PPM is supported"));
    }

    let mut pixels = vec![0u8; 3 * width as usize * height as usize];
    reader.read_exact(&mut pixels)?;

    let mut image = Image::new(width, height);
    for i in 0..(width as usize * height as usize) {
        image.r[i] = pixels[3 * i];
        image.g[i] = pixels[3 * i + 1];
        image.b[i] = pixels[3 * i + 2];
    }
    Ok(image)
}

fn write_ppm(path: &Path, image: &Image) -> io::Result<()> {
    let mut file = fs::File::create(path)?;
    write!(file, "P6\n{} {}\n255\n", image.width, image.height)?;
    let n = image.r.len();
    let mut pixels = Vec::with_capacity(3 * n);
    for i in 0..n {
        pixels.push(image.r[i]);
        pixels.push(image.g[i]);
        pixels.push(image.b[i]);
    }
    file.write_all(&pixels)
}

/// Reads one whitespace-delimited token, skipping `#`-prefixed comment
/// lines, the way the PPM "plain header" grammar requires.
fn read_token(reader: &mut impl Read) -> io::Result<String> {
    let mut token = String::new();
    let mut in_comment = false;
    let mut byte = [0u8; 1];
    loop {
        reader.read_exact(&mut byte)?;
        let c = byte[0] as char;
        if in_comment {
            if c == '\n' {
                in_comment = false;
            }
            continue;
        }
        if c == '#' {
            in_comment = true;
            continue;
        }
        if c.is_whitespace() {
            if !token.is_empty() {
                return Ok(token);
            }
            continue;
        }
        token.push(c);
    }
}
