//! Load one asset through the cache and print how it gets normalized

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use maquette_core::{Bounded, Transform3D};
use maquette_io::{AssetCache, LoaderRegistry};

#[derive(Parser, Debug)]
#[command(name = "inspect_asset")]
#[command(about = "Print the bounds and normalization of a glTF, PLY or OBJ asset")]
struct Cli {
    /// Directory that the source identifier is resolved against
    root: PathBuf,

    /// Source identifier, e.g. /assets/projects/agora/agora.glb
    source: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let cache = AssetCache::on_current_runtime(Arc::new(LoaderRegistry::with_default_readers(&cli.root)));
    let handle = cache.load(&cli.source).await?;
    let asset = handle.asset();

    println!("Asset: {}", handle.path());
    println!("  vertices:   {}", asset.vertex_count());
    println!("  primitives: {}", asset.root.primitive_count());
    match asset.root.bounding_box() {
        Some(bounds) => {
            println!("  bounds:     {:?} .. {:?}", bounds.min, bounds.max);
            println!("  size:       {:?}", bounds.size());
        }
        None => println!("  bounds:     none (no geometry)"),
    }

    let normalized = handle.normalized();
    println!("Normalized:");
    println!("  scale:       {}", normalized.scale);
    println!("  translation: {:?}", normalized.translation);
    if normalized.is_degenerate() {
        println!("  degenerate asset, left unscaled");
    }
    if let Some(bounds) = normalized.bounds() {
        println!("  bounds:      {:?} .. {:?}", bounds.min, bounds.max);
    }

    // what a GPU surface would upload for this asset
    let (mut vertex_bytes, mut index_bytes) = (0, 0);
    normalized.root.traverse(&Transform3D::identity(), &mut |node, _| {
        for primitive in &node.primitives {
            vertex_bytes += bytemuck::cast_slice::<_, u8>(primitive.mesh.to_vertices().as_slice()).len();
            index_bytes += bytemuck::cast_slice::<_, u8>(primitive.mesh.to_indices().as_slice()).len();
        }
    });
    println!("Upload: {} vertex bytes, {} index bytes", vertex_bytes, index_bytes);
    Ok(())
}
