use std::{net::SocketAddr, time::Duration};

use clap::{Args, Parser, Subcommand};

use crate::{
    refresh::DEFAULT_REFRESH_INTERVAL,
    sampler::{DEFAULT_DRAW_COUNT, DrawCount, Sampler, Shortfall},
    server::ServerConfig,
    store::{DEFAULT_DATABASE_URL, DEFAULT_QUERY},
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load channels from the database and serve random samples over TCP.
    Serve(ServeArgs),
    /// Request one sample from a running server and print it.
    Sample(SampleArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Socket address the server should bind to. Use port 0 for an ephemeral port.
    #[arg(long, default_value = "0.0.0.0:3334")]
    pub listen: SocketAddr,

    /// PostgreSQL connection string for the channel table.
    #[arg(long, default_value = DEFAULT_DATABASE_URL)]
    pub database_url: String,

    /// Query returning every `(id, serial)` row ordered by id.
    #[arg(long, default_value = DEFAULT_QUERY)]
    pub query: String,

    /// Seconds between cache refreshes.
    #[arg(
        long,
        default_value_t = DEFAULT_REFRESH_INTERVAL.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub refresh_interval: u64,

    /// Number of channels drawn per request, regardless of the client's limit.
    #[arg(
        long,
        default_value_t = DEFAULT_DRAW_COUNT as u64,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub draw_count: u64,

    /// Draw as many channels as the client asks for instead of a fixed count.
    #[arg(long, conflicts_with = "draw_count")]
    pub draw_from_limit: bool,

    /// Return the whole cache when it holds fewer channels than the draw,
    /// instead of closing the connection.
    #[arg(long)]
    pub clamp_draws: bool,

    /// Seconds a connection may take to send its request or receive the reply.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub io_timeout: Option<u64>,
}

impl ServeArgs {
    pub fn sampler(&self) -> Sampler {
        let draw = if self.draw_from_limit {
            DrawCount::Requested
        } else {
            DrawCount::Fixed(usize::try_from(self.draw_count).unwrap_or(usize::MAX))
        };
        let shortfall = if self.clamp_draws {
            Shortfall::Clamp
        } else {
            Shortfall::Reject
        };
        Sampler::new(draw, shortfall)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval)
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            sampler: self.sampler(),
            io_timeout: self.io_timeout.map(Duration::from_secs),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct SampleArgs {
    /// Address of the server to query.
    #[arg(long, default_value = "127.0.0.1:3334")]
    pub server: SocketAddr,

    /// Limit sent to the server.
    #[arg(long, default_value_t = 50)]
    pub limit: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serve_args(extra: &[&str]) -> Result<ServeArgs, clap::Error> {
        let args = ["channel_cache", "serve"].iter().chain(extra);
        match Cli::try_parse_from(args)?.command {
            Command::Serve(args) => Ok(args),
            other => panic!("expected serve command, got {other:?}"),
        }
    }

    #[test]
    fn serve_defaults_reproduce_fixed_draw() {
        let args = serve_args(&[]).unwrap();
        assert_eq!(args.listen, "0.0.0.0:3334".parse().unwrap());
        assert_eq!(args.refresh_interval(), Duration::from_secs(3600));
        assert_eq!(args.sampler(), Sampler::default());
        assert_eq!(args.server_config().io_timeout, None);
    }

    #[test]
    fn draw_policy_flags() {
        let args =
            serve_args(&["--draw-from-limit", "--clamp-draws", "--io-timeout", "5"]).unwrap();
        assert_eq!(
            args.sampler(),
            Sampler::new(DrawCount::Requested, Shortfall::Clamp)
        );
        assert_eq!(args.server_config().io_timeout, Some(Duration::from_secs(5)));

        let args = serve_args(&["--draw-count", "10"]).unwrap();
        assert_eq!(args.sampler().draw_count(1_000), 10);
    }

    #[test]
    fn rejects_conflicting_or_zero_values() {
        assert!(serve_args(&["--draw-count", "10", "--draw-from-limit"]).is_err());
        assert!(serve_args(&["--refresh-interval", "0"]).is_err());
        assert!(serve_args(&["--draw-count", "0"]).is_err());
    }
}
