//! One-off romaji check, handy for authoring prompt and caption files.

use anyhow::Result;
use typerush::RomajiTarget;

use crate::cli::CheckArgs;
use crate::render;

pub fn run(args: &CheckArgs) -> Result<()> {
    let target = RomajiTarget::with_cap(&args.canonical, args.cap);

    if args.variants || args.input.is_none() {
        println!("{} accepted spellings:", target.variants().len());
        for variant in target.variants() {
            println!("  {}", variant);
        }
    }

    if let Some(input) = &args.input {
        println!("prefix valid: {}", target.is_prefix_valid(input));
        println!("complete:     {}", target.is_complete(input));
        println!("{}", render::highlight(&target.highlight(input)));
    }
    Ok(())
}
