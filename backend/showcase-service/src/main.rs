use showcase_service::{config::Config, startup};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    startup::init_logging(config.app.json_logs);

    startup::run(config).await
}
