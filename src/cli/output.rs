use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;

#[derive(Clone, Debug, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    Yaml,
}

impl OutputFormat {
    /// Renders `value` for stdout; `human` is only called for the human format.
    pub fn render<T: Serialize>(&self, value: &T, human: impl FnOnce() -> String) -> Result<String> {
        Ok(match self {
            OutputFormat::Human => human(),
            OutputFormat::Json => serde_json::to_string_pretty(value)?,
            OutputFormat::Yaml => serde_yaml::to_string(value)?.trim_end().to_string(),
        })
    }

    pub fn print<T: Serialize>(&self, value: &T, human: impl FnOnce() -> String) -> Result<()> {
        println!("{}", self.render(value, human)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Report {
        connected: bool,
    }

    #[test]
    fn machine_formats_serialize_the_value() {
        let report = Report { connected: true };
        let json = OutputFormat::Json.render(&report, || unreachable!()).unwrap();
        assert_eq!(json, "{\n  \"connected\": true\n}");
        let yaml = OutputFormat::Yaml.render(&report, || unreachable!()).unwrap();
        assert_eq!(yaml, "connected: true");
        let human = OutputFormat::Human
            .render(&report, || "Wallet connected".to_string())
            .unwrap();
        assert_eq!(human, "Wallet connected");
    }
}
