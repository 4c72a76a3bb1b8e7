use std::process;

use weatherboard::config::Config;
use weatherboard::display::InkyWhat;
use weatherboard::image::IconLibrary;
use weatherboard::poller::Poller;
use weatherboard::weather::{self, NationalWeatherService, OpenWeather};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load().unwrap_or_else(|e| {
        log::error!("Configuration: {}", e);
        process::exit(1);
    });

    let client = weather::http_client(&config.user_agent).unwrap_or_else(|e| {
        log::error!("Unable to build HTTP client: {}", e);
        process::exit(1);
    });

    let display = InkyWhat::new().unwrap_or_else(|e| {
        log::error!("Unable to open display: {}", e);
        process::exit(1);
    });

    log::info!(
        "Showing weather for {:.4},{:.4}",
        config.latitude,
        config.longitude
    );

    let mut poller = Poller::new(
        OpenWeather::new(
            client.clone(),
            config.latitude,
            config.longitude,
            config.api_key.clone(),
        ),
        NationalWeatherService::new(client, config.latitude, config.longitude),
        display,
        IconLibrary::load(&config.icon_dir),
        &config.font_family,
    );

    poller.run().await;
}
