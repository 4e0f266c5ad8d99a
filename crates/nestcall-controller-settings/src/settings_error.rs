use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("failed to read configuration: {source}"), context(false))]
    BuildConfig { source: config::ConfigError },

    #[snafu(display("failed to apply configuration from {file_name} or environment"))]
    DeserializeConfig {
        file_name: String,
        #[snafu(source(from(serde_path_to_error::Error<config::ConfigError>, Box::new)))]
        source: Box<serde_path_to_error::Error<config::ConfigError>>,
    },
}
