//! xtask doc: host documentation, plus the fault crate once per capture variant.
//!
//! The capture module and the cfg-gated parts of `variant` only exist on Arm
//! targets, so the host build alone hides them. Each variant is documented
//! into its own target directory; two variants can share a triple.

use std::path::PathBuf;
use std::process::Command;
use std::time::Instant;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::check::{Variant, VARIANTS};

pub fn run(open: bool) -> Result<()> {
    println!();
    println!("{}", "📚 Building documentation...".cyan().bold());
    let start = Instant::now();

    let mut host = Command::new("cargo");
    host.args(["doc", "--workspace", "--no-deps", "--document-private-items"]);
    if open {
        host.arg("--open");
    }
    let output = host.output().context("Failed to build documentation")?;
    if !output.status.success() {
        eprintln!("{}", "✗ Host documentation failed".red().bold());
        eprintln!();
        eprintln!("{}", String::from_utf8_lossy(&output.stderr));
        anyhow::bail!("Documentation build failed");
    }
    println!("{}", "  ✓ host (decoder, report, capture model)".green());

    let mut failed = Vec::new();
    for variant in VARIANTS {
        let output = variant
            .cargo("doc")
            .args(["--no-deps", "--document-private-items", "--target-dir"])
            .arg(target_dir(variant))
            .output()
            .with_context(|| format!("Failed to document {}", variant.label))?;
        if output.status.success() {
            println!("{}", format!("  ✓ {}", variant.label).green());
        } else {
            eprintln!("{}", format!("  ✗ {}", variant.label).red());
            eprintln!("{}", String::from_utf8_lossy(&output.stderr));
            failed.push(variant.label);
        }
    }

    println!();
    if !failed.is_empty() {
        anyhow::bail!("Documentation failed for: {}", failed.join(", "));
    }
    println!(
        "{}",
        format!("✓ Documentation built in {:.2}s", start.elapsed().as_secs_f64()).green()
    );
    println!("   {}", "Host: target/doc/fault/index.html".dimmed());
    for variant in VARIANTS {
        println!("   {}", format!("{}: {}", variant.label, index_page(variant).display()).dimmed());
    }
    println!();
    Ok(())
}

fn target_dir(variant: &Variant) -> PathBuf {
    PathBuf::from("target").join("variant-doc").join(variant.slug)
}

fn index_page(variant: &Variant) -> PathBuf {
    target_dir(variant)
        .join(variant.target)
        .join("doc")
        .join("fault")
        .join("index.html")
}

#[cfg(test)]
#[allow(clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn variants_sharing_a_triple_get_separate_pages() {
        let mains: Vec<_> = VARIANTS
            .iter()
            .filter(|v| v.target == "thumbv8m.main-none-eabihf")
            .map(index_page)
            .collect();
        assert!(mains.len() > 1);
        for (i, page) in mains.iter().enumerate() {
            assert!(!mains.iter().skip(i + 1).any(|other| other == page));
        }
    }

    #[test]
    fn index_page_is_under_the_target_triple() {
        let page = index_page(&VARIANTS[0]);
        assert!(page.ends_with("thumbv6m-none-eabi/doc/fault/index.html"));
        assert!(page.starts_with("target/variant-doc/v6m"));
    }
}
