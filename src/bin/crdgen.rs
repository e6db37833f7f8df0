// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! CRD YAML Generator
//!
//! Generates the `ExternalDNS` CRD YAML from the Rust types in src/crd.rs, keeping
//! deploy/crds/ in sync with the code.
//!
//! Usage:
//!   cargo run --bin crdgen

use external_dns_operator::crd::ExternalDNS;
use kube::CustomResourceExt;
use std::fs;
use std::path::{Path, PathBuf};

const OUTPUT_DIR: &str = "deploy/crds";

const GENERATED_HEADER: &str = "# Copyright (c) 2025 Erick Bourgeois, firestoned
# SPDX-License-Identifier: MIT
#
# This file is AUTO-GENERATED from src/crd.rs
# DO NOT EDIT MANUALLY - Run `cargo run --bin crdgen` to regenerate
#
";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output_dir = Path::new(OUTPUT_DIR);
    fs::create_dir_all(output_dir)?;

    let path = write_crd::<ExternalDNS>(output_dir, "externaldnses.crd.yaml")?;
    println!("Wrote {}", path.display());
    println!("Install with: kubectl apply -f {OUTPUT_DIR}/");

    Ok(())
}

/// Render `T`'s CRD below the generated-file header and write it to `dir/filename`.
fn write_crd<T: CustomResourceExt>(
    dir: &Path,
    filename: &str,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let yaml = serde_yaml::to_string(&T::crd())?;
    let path = dir.join(filename);
    fs::write(&path, format!("{GENERATED_HEADER}{yaml}"))?;
    Ok(path)
}
