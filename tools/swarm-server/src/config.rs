//! Server configuration: `config/default.toml` layered under an optional
//! `config/local.toml` and `SWARM_`-prefixed environment overrides, with
//! `--config`/`--bind` as the final layer from the command line.

use clap::Parser;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Network interface to bind the HTTP/WebSocket listener to.
    pub interface: String,
    /// Port to bind the HTTP/WebSocket listener to.
    pub port: u16,
    /// Directory for runtime files (created at startup if missing).
    pub rundir: String,
    /// Shared password required on the join URL's `password` parameter.
    /// `None` means any join is accepted.
    pub password: Option<String>,

    /// Number of boards created for each new game.
    pub num_boards: usize,
    /// Wins required on one side to end the match.
    pub target_num_wins: i32,

    /// Starting souls (tech/spell currency) granted to S0 at match start.
    pub s0_starting_souls_per_board: i32,
    /// Starting souls granted to S1 at match start.
    pub s1_starting_souls_per_board: i32,
    /// Extra souls S0 gains at the end of each of its turns, on top of
    /// graveyard income.
    pub s0_extra_souls_per_turn: i32,
    /// Extra souls S1 gains at the end of each of its turns.
    pub s1_extra_souls_per_turn: i32,

    /// Seconds S0's turn clock runs before the coordinator auto-completes it.
    pub s0_seconds_per_turn: u64,
    /// Seconds S1's turn clock runs before the coordinator auto-completes it.
    pub s1_seconds_per_turn: u64,

    /// Shuffle the tech line (beyond `num_fixed_techs`) at match setup.
    pub randomize_tech_line: bool,
    /// Leading tech-line entries left untouched by `randomize_tech_line`.
    pub num_fixed_techs: usize,
    /// Seed for any randomized match setup (tech-line shuffle today).
    pub rand_seed: u64,
    /// Whether advanced map layouts may be selected for new boards.
    pub include_advanced_maps: bool,

    /// Seconds a connection may sit with no incoming frame before the
    /// server closes it.
    pub idle_timeout: u64,
    /// Suggested seconds between client heartbeats; advisory only — the
    /// server does not itself enforce a client's cadence.
    pub client_heartbeat_rate: u64,

    /// Local port the Prometheus metrics exporter listens on.
    pub metrics_port: u16,
}

impl ServerConfig {
    /// `host:port` to bind the HTTP/WebSocket listener to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.interface, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            interface: "0.0.0.0".into(),
            port: 3030,
            rundir: "/tmp/swarm-server".into(),
            password: None,
            num_boards: 2,
            target_num_wins: 3,
            s0_starting_souls_per_board: 0,
            s1_starting_souls_per_board: 0,
            s0_extra_souls_per_turn: 0,
            s1_extra_souls_per_turn: 0,
            s0_seconds_per_turn: 300,
            s1_seconds_per_turn: 300,
            randomize_tech_line: false,
            num_fixed_techs: 0,
            rand_seed: 0,
            include_advanced_maps: false,
            idle_timeout: 600,
            client_heartbeat_rate: 20,
            metrics_port: 9000,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "swarm-server", about = "Multi-board swarm game coordinator")]
pub struct Cli {
    /// Path to a config file layered on top of the built-in defaults.
    #[arg(long)]
    pub config: Option<String>,
    /// Overrides `interface:port` from the config file/environment.
    #[arg(long)]
    pub bind: Option<String>,
}

/// Load config from built-in defaults, an optional file, `SWARM_`-prefixed
/// environment variables, then the `--bind` CLI override, in that order.
pub fn load(cli: &Cli) -> Result<ServerConfig, config::ConfigError> {
    let defaults = ServerConfig::default();
    let mut builder = config::Config::builder()
        .set_default("interface", defaults.interface)?
        .set_default("port", defaults.port as i64)?
        .set_default("rundir", defaults.rundir)?
        .set_default("password", None::<String>)?
        .set_default("num_boards", defaults.num_boards as i64)?
        .set_default("target_num_wins", defaults.target_num_wins as i64)?
        .set_default("s0_starting_souls_per_board", defaults.s0_starting_souls_per_board as i64)?
        .set_default("s1_starting_souls_per_board", defaults.s1_starting_souls_per_board as i64)?
        .set_default("s0_extra_souls_per_turn", defaults.s0_extra_souls_per_turn as i64)?
        .set_default("s1_extra_souls_per_turn", defaults.s1_extra_souls_per_turn as i64)?
        .set_default("s0_seconds_per_turn", defaults.s0_seconds_per_turn as i64)?
        .set_default("s1_seconds_per_turn", defaults.s1_seconds_per_turn as i64)?
        .set_default("randomize_tech_line", defaults.randomize_tech_line)?
        .set_default("num_fixed_techs", defaults.num_fixed_techs as i64)?
        .set_default("rand_seed", defaults.rand_seed as i64)?
        .set_default("include_advanced_maps", defaults.include_advanced_maps)?
        .set_default("idle_timeout", defaults.idle_timeout as i64)?
        .set_default("client_heartbeat_rate", defaults.client_heartbeat_rate as i64)?
        .set_default("metrics_port", defaults.metrics_port as i64)?;

    if let Some(path) = &cli.config {
        builder = builder.add_source(config::File::with_name(path));
    }
    builder = builder.add_source(config::Environment::with_prefix("SWARM"));

    let mut cfg: ServerConfig = builder.build()?.try_deserialize()?;
    if let Some(bind) = &cli.bind {
        let (interface, port) =
            bind.rsplit_once(':').ok_or_else(|| config::ConfigError::Message(format!("--bind {bind} is not host:port")))?;
        cfg.interface = interface.to_string();
        cfg.port = port.parse().map_err(|_| config::ConfigError::Message(format!("--bind port {port} is not a number")))?;
    }
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_with_no_overrides() {
        let cfg = load(&Cli { config: None, bind: None }).unwrap();
        assert_eq!(cfg.bind_addr(), "0.0.0.0:3030");
        assert_eq!(cfg.num_boards, 2);
        assert_eq!(cfg.target_num_wins, 3);
        assert_eq!(cfg.password, None);
        assert_eq!(cfg.s0_seconds_per_turn, 300);
    }

    #[test]
    fn cli_bind_overrides_default() {
        let cfg = load(&Cli { config: None, bind: Some("127.0.0.1:4040".into()) }).unwrap();
        assert_eq!(cfg.bind_addr(), "127.0.0.1:4040");
    }

    #[test]
    fn env_override_beats_the_built_in_default() {
        std::env::set_var("SWARM_NUM_BOARDS", "5");
        let cfg = load(&Cli { config: None, bind: None }).unwrap();
        std::env::remove_var("SWARM_NUM_BOARDS");
        assert_eq!(cfg.num_boards, 5);
    }

    #[test]
    fn env_override_sets_the_join_password() {
        std::env::set_var("SWARM_PASSWORD", "hunter2");
        let cfg = load(&Cli { config: None, bind: None }).unwrap();
        std::env::remove_var("SWARM_PASSWORD");
        assert_eq!(cfg.password.as_deref(), Some("hunter2"));
    }

    #[test]
    fn env_overrides_per_side_souls_and_seconds_per_turn() {
        std::env::set_var("SWARM_S0_STARTING_SOULS_PER_BOARD", "12");
        std::env::set_var("SWARM_S1_SECONDS_PER_TURN", "90");
        let cfg = load(&Cli { config: None, bind: None }).unwrap();
        std::env::remove_var("SWARM_S0_STARTING_SOULS_PER_BOARD");
        std::env::remove_var("SWARM_S1_SECONDS_PER_TURN");
        assert_eq!(cfg.s0_starting_souls_per_board, 12);
        assert_eq!(cfg.s1_seconds_per_turn, 90);
    }
}
