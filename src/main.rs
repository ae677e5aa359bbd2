use ttv_rs::{
    config::{self, Config},
    quality::Quality,
    supervisor::{self, ChannelTarget},
    twitch::TwitchApi,
    util::HttpClient,
};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Read channel and optional quality bound from args
    let name = std::env::args().nth(1).expect("No channel name provided");
    let quality = std::env::args()
        .nth(2)
        .unwrap_or_else(|| String::from("infp"))
        .parse::<Quality>()
        .expect("Could not parse quality");

    // The service Client-ID lives in info.json next to the binary
    let config = Config::load(config::CONFIG_FILE).expect("Could not load config");
    let client = HttpClient::new(&config.client_id).expect("Could not create HttpClient");
    let api = TwitchApi::new(client);

    let target = ChannelTarget { name, quality };
    supervisor::run(&api, &target)
        .await
        .expect("Capture loop exited with error");
}
