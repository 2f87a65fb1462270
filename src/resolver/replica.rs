//! Replica naming strategies.
//!
//! A registered template address encodes a replica family: the deployment
//! suffixes concrete replica hostnames with `-1`, `-2`, `-3`, etc. The
//! default strategy derives the suffix from the template's port digits.
//! The arithmetic is deployment-coupled; it is preserved exactly and kept
//! behind a trait so a real instance list can replace it without touching
//! the resolver's control flow.

/// Maps a template address to the concrete instance address.
pub trait ReplicaNaming: Send + Sync + std::fmt::Debug {
    fn concrete_address(&self, service_name: &str, template: &str) -> String;
}

/// Port-digit naming: the last decimal digit of the template's port selects
/// the replica suffix.
///
/// For the "profile" service the suffix is `|digit - 3|`, with 0 replaced
/// by 1; every other service uses the digit itself. The port is unchanged.
/// Templates without a trailing numeric port pass through untouched.
#[derive(Debug, Default)]
pub struct PortDigitNaming;

impl ReplicaNaming for PortDigitNaming {
    fn concrete_address(&self, service_name: &str, template: &str) -> String {
        let Some((prefix, port)) = template.rsplit_once(':') else {
            return template.to_string();
        };
        if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
            return template.to_string();
        }

        // prefix is "scheme://host"; only the host grows a suffix.
        let last_digit = (port.as_bytes()[port.len() - 1] - b'0') as i32;
        let suffix = if service_name == "profile" {
            match (last_digit - 3).abs() {
                0 => 1,
                n => n,
            }
        } else {
            last_digit
        };

        format!("{}-{}:{}", prefix, suffix, port)
    }
}

/// Identity naming: templates are already concrete addresses.
#[derive(Debug, Default)]
pub struct PassthroughNaming;

impl ReplicaNaming for PassthroughNaming {
    fn concrete_address(&self, _service_name: &str, template: &str) -> String {
        template.to_string()
    }
}
