use clap::Parser;
use std::env;

/// Q&A board web service
#[derive(Parser, Debug, PartialEq)]
#[clap(author, version, about, long_about = None)]
pub struct Config {
    /// Which errors we want to log (info, warn or error)
    #[clap(short, long, default_value = "warn")]
    pub log_level: String,
    /// Which PORT the server is listening to
    #[clap(short, long, default_value = "8080")]
    pub port: u16,
    /// Database user
    #[clap(long, default_value = "username")]
    pub db_user: String,
    /// Database password
    #[clap(long, default_value = "password")]
    pub db_password: String,
    /// URL for the postgres database
    #[clap(long, default_value = "localhost")]
    pub db_host: String,
    /// PORT number for the database connection
    #[clap(long, default_value = "5432")]
    pub db_port: u16,
    /// Database name
    #[clap(long, default_value = "askboard")]
    pub db_name: String,
}

impl Config {
    pub fn new() -> Result<Config, handle_errors::Error> {
        if env::var("PASETO_KEY").is_err() {
            panic!("PASETO_KEY not set");
        }

        Config::with_env(Config::parse())
    }

    /// Applies the environment on top of the parsed command line.
    pub fn with_env(config: Config) -> Result<Config, handle_errors::Error> {
        let port = env::var("PORT")
            .ok()
            .map(|val| val.parse::<u16>())
            .unwrap_or(Ok(config.port))
            .map_err(handle_errors::Error::ParseError)?;

        let db_user = env::var("POSTGRES_USER").unwrap_or(config.db_user);
        let db_password = env::var("POSTGRES_PASSWORD").unwrap_or(config.db_password);
        let db_host = env::var("POSTGRES_HOST").unwrap_or(config.db_host);
        let db_port = env::var("POSTGRES_PORT")
            .ok()
            .map(|val| val.parse::<u16>())
            .unwrap_or(Ok(config.db_port))
            .map_err(handle_errors::Error::ParseError)?;
        let db_name = env::var("POSTGRES_DB").unwrap_or(config.db_name);

        Ok(Config {
            log_level: config.log_level,
            port,
            db_user,
            db_password,
            db_host,
            db_port,
            db_name,
        })
    }

    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.db_user, self.db_password, self.db_host, self.db_port, self.db_name
        )
    }
}
