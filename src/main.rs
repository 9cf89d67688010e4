use cube_glb::CubeConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    };

    let config = CubeConfig::default();
    let summary = cube_glb::run(&config).await?;
    log::info!(
        "{}: {} positions, {} indices, material {:?} with a {:?} texture",
        config.output.display(),
        summary.positions.len(),
        summary.indices.len(),
        summary.bound_material,
        summary.bound_texture_size
    );
    Ok(())
}
