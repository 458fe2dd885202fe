use std::path::PathBuf;

use asedoc::codec;
use asedoc::doc::{AnimationDirection, ColorMode, Layer, Slice, Sprite, Tag};
use clap::{Parser, Subcommand};
use itertools::Itertools as _;

fn mode_name(mode: ColorMode) -> &'static str {
    match mode {
        ColorMode::Rgba => "RGBA",
        ColorMode::Grayscale => "grayscale",
        ColorMode::Indexed => "indexed",
        ColorMode::Tilemap => "tilemap",
    }
}

fn direction_name(direction: AnimationDirection) -> &'static str {
    match direction {
        AnimationDirection::Forward => "forward",
        AnimationDirection::Reverse => "reverse",
        AnimationDirection::PingPong => "ping-pong",
        AnimationDirection::PingPongReverse => "ping-pong-reverse",
    }
}

fn describe_tag(tag: &Tag) -> String {
    format!(
        "{:?} [{}..{}] {}",
        tag.name(),
        tag.from_frame(),
        tag.to_frame(),
        direction_name(tag.direction())
    )
}

fn describe_slice(slice: &Slice) -> String {
    format!("{:?} ({} key(s))", slice.name(), slice.keys().len())
}

/// Prints the structure of a sprite file.
#[derive(Parser)]
struct Info {
    /// Path to the sprite file (.ase / .aseprite).
    #[clap(index = 1)]
    file: PathBuf,
    /// Also list the cels present on every frame.
    #[clap(short = 'c', long, default_value = "false")]
    cels: bool,
}

impl Info {
    fn run(&self) -> anyhow::Result<()> {
        let document = codec::decode_file(&self.file)?;
        let sprite = document.sprite();

        let total_ms: u32 = sprite
            .frames()
            .iter()
            .map(|frame| u32::from(frame.duration_ms()))
            .sum();
        println!(
            "{}: {}x{} {}, {} frame(s), {} ms total",
            self.file.display(),
            sprite.width(),
            sprite.height(),
            mode_name(sprite.mode()),
            sprite.frame_count(),
            total_ms
        );

        println!("layers (bottom to top):");
        for (depth, layer) in sprite.flattened_layers() {
            let indent = "  ".repeat(usize::from(depth) + 1);
            let kind = match layer {
                Layer::Image(_) => "image",
                Layer::Group(_) => "group",
                Layer::Tilemap(_) => "tilemap",
            };
            let visibility = if layer.core().is_visible() { "" } else { " (hidden)" };
            let cel_count = layer.cels().map_or(0, std::collections::BTreeMap::len);
            println!(
                "{indent}{:?}: {kind}, opacity {}, {cel_count} cel(s){visibility}",
                layer.name(),
                layer.core().opacity()
            );
        }

        for palette in sprite.palettes() {
            println!(
                "palette from frame {}: {} color(s)",
                palette.first_frame(),
                palette.len()
            );
        }
        for tileset in sprite.tilesets() {
            println!(
                "tileset {:?}: {}x{} px, {} tile(s)",
                tileset.name(),
                tileset.tile_width(),
                tileset.tile_height(),
                tileset.tile_count()
            );
        }
        if !sprite.tags().is_empty() {
            println!(
                "tags: {}",
                sprite.tags().iter().map(describe_tag).join(", ")
            );
        }
        if !sprite.slices().is_empty() {
            println!(
                "slices: {}",
                sprite.slices().iter().map(describe_slice).join(", ")
            );
        }

        if self.cels {
            self.print_cels(sprite);
        }
        Ok(())
    }

    fn print_cels(&self, sprite: &Sprite) {
        for frame in 0..sprite.frame_count() {
            let frame = u16::try_from(frame).unwrap_or(u16::MAX);
            let cels = sprite.cels_at(frame);
            if cels.is_empty() {
                continue;
            }
            println!("frame {frame}:");
            for (layer, cel) in cels {
                let content = match cel.linked_to() {
                    Some(target) => format!("link to frame {target}"),
                    None => cel.image().map_or_else(
                        || "empty".to_string(),
                        |image| format!("{}x{} px", image.width(), image.height()),
                    ),
                };
                println!(
                    "  {:?} at ({}, {}): {content}",
                    layer.name(),
                    cel.x(),
                    cel.y()
                );
            }
        }
    }
}

/// Decodes a sprite file and writes it back out, byte-normalised.
#[derive(Parser)]
struct Recode {
    /// Path of the sprite file to read.
    #[clap(index = 1)]
    input: PathBuf,
    /// Path of the sprite file to write (.ase / .aseprite).
    #[clap(index = 2)]
    output: PathBuf,
}

impl Recode {
    fn run(&self) -> anyhow::Result<()> {
        let mut document = codec::decode_file(&self.input)?;
        codec::encode_file(&mut document, &self.output)?;
        println!(
            "recoded {} -> {}",
            self.input.display(),
            self.output.display()
        );
        Ok(())
    }
}

/// The command to run.
#[derive(Subcommand)]
enum Command {
    #[clap(about = "Prints the structure of a sprite file.")]
    Info(Info),
    #[clap(about = "Decodes a sprite file and re-encodes it to a new path.")]
    Recode(Recode),
}

impl Command {
    fn run(&self) -> anyhow::Result<()> {
        match self {
            Command::Info(info) => info.run(),
            Command::Recode(recode) => recode.run(),
        }
    }
}

/// A command line tool for inspecting and rewriting Aseprite sprite files.
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// The command to run.
    #[clap(subcommand)]
    command: Command,
}

impl Cli {
    pub fn run(&self) -> anyhow::Result<()> {
        self.command.run()
    }
}
