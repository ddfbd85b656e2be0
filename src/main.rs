use blocky::AppConfig;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("blocky=info"))
        .init();

    log::info!(
        "drag to orbit, shift+click to poke, A/S to start/stop the idle cycle, \
         U/J I/K O/L to pose the left leg, arrows to turn"
    );

    blocky::run(AppConfig::new().title("Blocky Koala"))?;
    Ok(())
}
