// Copyright © 2024 Pathway

use std::env;
use std::error;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("couldn't parse the value of {0:?} environment variable as UTF-8 string")]
    NotUtf8(String),

    #[error("couldn't parse the value of {0:?} environment variable: {1}")]
    ParsingFailed(String, #[source] Box<dyn error::Error + Send + Sync>),

    #[error("environment variable {0:?} is not a flag, expected one of 1/0/true/false/yes/no")]
    NotAFlag(String),
}

fn read_env_var(name: &str) -> Result<Option<String>, Error> {
    env::var_os(name)
        .map(|value| {
            value
                .into_string()
                .map_err(|_| Error::NotUtf8(name.to_string()))
        })
        .transpose()
}

pub fn parse_env_var<T: FromStr>(name: &str) -> Result<Option<T>, Error>
where
    T::Err: error::Error + Send + Sync + 'static,
{
    let Some(value) = read_env_var(name)? else {
        return Ok(None);
    };
    value
        .trim()
        .parse()
        .map(Some)
        .map_err(|err| Error::ParsingFailed(name.to_string(), Box::new(err)))
}

/// Reads a boolean switch. Unset means `None`, an empty value means `true`.
pub fn parse_env_flag(name: &str) -> Result<Option<bool>, Error> {
    let Some(value) = read_env_var(name)? else {
        return Ok(None);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(Error::NotAFlag(name.to_string())),
    }
}

/// Overwrites `target` with the parsed variable when it is set.
pub fn override_from_env<T: FromStr>(target: &mut T, name: &str) -> Result<(), Error>
where
    T::Err: error::Error + Send + Sync + 'static,
{
    if let Some(value) = parse_env_var(name)? {
        *target = value;
    }
    Ok(())
}
