//! Validation of page sources before they are stored.
//!
//! URL-like configuration values (`repository`, `*url`, `*Url`) must match the
//! import whitelist. With an empty whitelist, hosts that resolve to the local
//! network are rejected unless private sources are allowed.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use quire_store::PageSource;
use url::{Host, Url};

use crate::error::PageError;

/// Source URL acceptance settings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImportSettings {
    /// Accept any host, including loopback and private networks.
    pub allow_private: bool,
    /// Accepted URL prefixes. Empty means "any public host".
    pub whitelist: Vec<String>,
}

fn is_url_key(key: &str) -> bool {
    key == "repository" || key.ends_with("url") || key.ends_with("Url")
}

/// Check every URL-like value of a source configuration.
///
/// # Errors
///
/// Returns [`PageError::UrlForbidden`] for the first rejected value.
pub fn check_source_urls(source: &PageSource, settings: &ImportSettings) -> Result<(), PageError> {
    if settings.allow_private {
        return Ok(());
    }

    for url in source
        .config
        .iter()
        .filter(|(key, _)| is_url_key(key))
        .map(|(_, value)| value.as_str())
    {
        check_url(url, &settings.whitelist)?;
    }
    Ok(())
}

fn check_url(value: &str, whitelist: &[String]) -> Result<(), PageError> {
    let forbidden = || PageError::UrlForbidden(value.to_owned());

    if !whitelist.is_empty() {
        return if whitelist.iter().any(|prefix| value.starts_with(prefix.as_str())) {
            Ok(())
        } else {
            Err(forbidden())
        };
    }

    let url = Url::parse(value).map_err(|_| forbidden())?;
    match url.host() {
        Some(Host::Domain(domain)) if is_local_domain(domain) => Err(forbidden()),
        Some(Host::Domain(domain)) => match IpAddr::from_str(domain) {
            Ok(ip) if is_private_ip(ip) => Err(forbidden()),
            _ => Ok(()),
        },
        Some(Host::Ipv4(ip)) if is_private_ip(IpAddr::V4(ip)) => Err(forbidden()),
        Some(Host::Ipv6(ip)) if is_private_ip(IpAddr::V6(ip)) => Err(forbidden()),
        Some(_) => Ok(()),
        None => Err(forbidden()),
    }
}

fn is_local_domain(domain: &str) -> bool {
    let domain = domain.trim_end_matches('.').to_ascii_lowercase();
    domain == "localhost" || domain.ends_with(".localhost") || domain.ends_with(".local")
}

fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(ip) => is_private_ipv4(ip),
        IpAddr::V6(ip) => {
            if let Some(mapped) = ip.to_ipv4_mapped() {
                return is_private_ipv4(mapped);
            }
            is_private_ipv6(ip)
        }
    }
}

fn is_private_ipv4(ip: Ipv4Addr) -> bool {
    ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
}

fn is_private_ipv6(ip: Ipv6Addr) -> bool {
    ip.is_loopback() || ip.is_unspecified() || ip.is_unique_local() || ip.is_unicast_link_local()
}

/// Check the cron expression of a source, if any.
///
/// # Errors
///
/// Returns [`PageError::Technical`] if the expression does not parse.
pub fn check_fetch_cron(source: &PageSource) -> Result<(), PageError> {
    match source.fetch_cron.as_deref().filter(|c| !c.trim().is_empty()) {
        Some(expression) => cron::Schedule::from_str(expression)
            .map(|_| ())
            .map_err(|e| {
                PageError::technical_with(format!("Invalid fetch cron [{expression}]"), e)
            }),
        None => Ok(()),
    }
}
