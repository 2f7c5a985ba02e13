use cloudtail::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ClientError> {
    cloudtail::init_logging();

    let deployment_id = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "demo-deployment".into());
    let identity = Identity::load();
    if !identity.is_logged_in() {
        eprintln!("no credentials found; set CLOUDTAIL_TOKEN first");
        std::process::exit(1);
    }

    let client = ApiClient::new(ClientConfig::from_env(), &identity)?;
    let mut logs = client.stream_build_logs(deployment_id);

    while let Some(item) = logs.next().await {
        match item {
            Ok(BuildLogEvent::Message { message, .. }) => println!("{message}"),
            Ok(BuildLogEvent::Complete { .. }) => println!("build complete"),
            Ok(BuildLogEvent::Failed { .. }) => {
                eprintln!("build failed");
                std::process::exit(1);
            }
            Ok(_) => {}
            Err(err) => {
                eprintln!("build log stream failed: {err}");
                std::process::exit(1);
            }
        }
    }
    Ok(())
}
