use cloudtail::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ClientError> {
    cloudtail::init_logging();

    let app_id = std::env::args().nth(1).unwrap_or_else(|| "demo-app".into());
    let identity = Identity::load();
    if !identity.is_logged_in() {
        eprintln!("no credentials found; set CLOUDTAIL_TOKEN first");
        std::process::exit(1);
    }

    let client = ApiClient::new(ClientConfig::from_env(), &identity)?;
    let mut logs = client.stream_app_logs(app_id, AppLogOptions::default().tail(50))?;

    while let Some(item) = logs.next().await {
        match item {
            Ok(entry) => println!("{} [{}] {}", entry.timestamp, entry.level, entry.message),
            Err(err) => {
                eprintln!("log stream failed: {err}");
                std::process::exit(1);
            }
        }
    }
    Ok(())
}
