use super::*;

#[derive(Debug, Parser)]
pub(crate) struct Watch {
    #[arg(help = "Stratum <ENDPOINT> as host:port or stratum+tcp://host:port.")]
    endpoint: String,
    #[arg(long, env = "PICKAXE_USERNAME", help = "Stratum <USERNAME>.")]
    username: String,
    #[arg(
        long,
        env = "PICKAXE_PASSWORD",
        default_value = "x",
        help = "Stratum <PASSWORD>."
    )]
    password: String,
    #[arg(
        long,
        default_value = "10",
        help = "Give up on connects and requests after <TIMEOUT> seconds."
    )]
    timeout: u64,
    #[arg(long, help = "Exit <ONCE> the first job arrives.")]
    once: bool,
}

impl Watch {
    fn config(&self) -> ClientConfig {
        ClientConfig::new(&self.endpoint, &self.username, &self.password)
            .with_timeout(Duration::from_secs(self.timeout))
    }

    pub(crate) async fn run(self, cancel_token: CancellationToken) -> Result {
        let config = self.config();

        let endpoint = config
            .endpoint()
            .with_context(|| format!("invalid endpoint `{}`", self.endpoint))?;

        info!("Connecting to {endpoint} as {}", self.username);

        let (client, mut events) = Client::spawn(config);

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    client.close("Shutting down").await?;
                    return Ok(());
                }
                event = events.recv() => match event {
                    Ok(Event::Job(job)) => {
                        print_job(&job)?;

                        if self.once {
                            client.close("Received first job").await?;
                            return Ok(());
                        }
                    }
                    Ok(Event::Close { reason }) => {
                        return Err(anyhow!("pool session closed: {reason}"));
                    }
                    Ok(event) => debug!("Session event: {event:?}"),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Fell behind, skipped {skipped} session events");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(anyhow!("client stopped unexpectedly"));
                    }
                },
            }
        }
    }
}

fn print_job(job: &Job) -> Result {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, job)?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}
