use super::*;

mod watch;

#[derive(Debug, Parser)]
pub(crate) enum Subcommand {
    #[command(about = "Follow the jobs a Stratum pool hands out")]
    Watch(watch::Watch),
}

impl Subcommand {
    pub(crate) async fn run(self, cancel_token: CancellationToken) -> Result {
        match self {
            Self::Watch(watch) => watch.run(cancel_token).await,
        }
    }
}
