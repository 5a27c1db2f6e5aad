//! Connection parameter autodetection from the resolver's native config.
//!
//! The native file is line oriented:
//!
//! ```text
//! server:
//!     statistics-cumulative: yes
//! remote-control:
//!     control-enable: yes
//!     control-interface: 0.0.0.0
//!     control-port: 8953
//! include: "/etc/unbound/unbound.conf.d/*.conf"
//! ```
//!
//! Resolution is best-effort: a missing or malformed file only suppresses the
//! overrides. The single init-fatal outcome is `control-enable: no`.

use std::collections::HashSet;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::collector::traits::FileSystem;
use crate::config::UnboundConfig;

/// Port the resolver listens on when `control-port` is not given.
pub const DEFAULT_CONTROL_PORT: &str = "8953";

/// Maximum `include:` nesting depth.
const MAX_INCLUDE_DEPTH: usize = 8;

const SECTION_SERVER: &str = "server";
const SECTION_REMOTE_CONTROL: &str = "remote-control";

/// Clause names the resolver accepts. Any other `name:` without a value is
/// an empty directive, not a section header.
const SECTIONS: &[&str] = &[
    SECTION_SERVER,
    SECTION_REMOTE_CONTROL,
    "stub-zone",
    "forward-zone",
    "auth-zone",
    "view",
    "python",
    "dynlib",
    "dnscrypt",
    "cachedb",
    "dnstap",
    "rpz",
];

/// Returns true if the address is a domain socket path.
pub fn is_unix_socket(address: &str) -> bool {
    address.starts_with('/')
}

/// Overrides discovered in the native configuration.
///
/// Each field is independent; only `Some` values replace the configured ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceOverrides {
    pub cumulative: Option<bool>,
    pub use_tls: Option<bool>,
    pub tls_key: Option<PathBuf>,
    pub tls_cert: Option<PathBuf>,
    pub tls_ca: Option<PathBuf>,
    pub interface: Option<String>,
    pub port: Option<String>,
}

/// Outcome of resolving the native configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Remote control is switched off; the collector cannot work.
    Disabled,
    Overrides(ServiceOverrides),
}

impl Resolution {
    fn none() -> Self {
        Resolution::Overrides(ServiceOverrides::default())
    }
}

impl ServiceOverrides {
    pub fn is_empty(&self) -> bool {
        *self == ServiceOverrides::default()
    }

    /// Merges present fields into `config`, logging every change.
    pub fn apply(&self, config: &mut UnboundConfig) {
        if let Some(cumulative) = self.cumulative
            && cumulative != config.cumulative_stats
        {
            debug!(
                "changing 'cumulative_stats': {} => {}",
                config.cumulative_stats, cumulative
            );
            config.cumulative_stats = cumulative;
        }
        if let Some(use_tls) = self.use_tls
            && use_tls != config.use_tls
        {
            debug!("changing 'use_tls': {} => {}", config.use_tls, use_tls);
            config.use_tls = use_tls;
        }
        if let Some(key) = &self.tls_key
            && *key != config.tls_key
        {
            debug!(
                "changing 'tls_key': '{}' => '{}'",
                config.tls_key.display(),
                key.display()
            );
            config.tls_key = key.clone();
        }
        if let Some(cert) = &self.tls_cert
            && *cert != config.tls_cert
        {
            debug!(
                "changing 'tls_cert': '{}' => '{}'",
                config.tls_cert.display(),
                cert.display()
            );
            config.tls_cert = cert.clone();
        }
        if let Some(ca) = &self.tls_ca
            && config.tls_ca.as_ref() != Some(ca)
        {
            debug!("changing 'tls_ca': {:?} => '{}'", config.tls_ca, ca.display());
            config.tls_ca = Some(ca.clone());
        }
        if let Some(iface) = &self.interface {
            let address = control_address(iface);
            if address != config.address {
                debug!("changing 'address': '{}' => '{}'", config.address, address);
                config.address = address;
            }
        }
        if let Some(port) = &self.port
            && !is_unix_socket(&config.address)
            && let Some((host, current)) = split_host_port(&config.address)
            && current != port
        {
            let address = join_host_port(host, port);
            debug!("changing 'address': '{}' => '{}'", config.address, address);
            config.address = address;
        }
    }
}

impl fmt::Display for ServiceOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if let Some(v) = self.cumulative {
            parts.push(format!("cumulative={}", v));
        }
        if let Some(v) = self.use_tls {
            parts.push(format!("use_tls={}", v));
        }
        if let Some(v) = &self.tls_key {
            parts.push(format!("tls_key={}", v.display()));
        }
        if let Some(v) = &self.tls_cert {
            parts.push(format!("tls_cert={}", v.display()));
        }
        if let Some(v) = &self.tls_ca {
            parts.push(format!("tls_ca={}", v.display()));
        }
        if let Some(v) = &self.interface {
            parts.push(format!("interface={}", v));
        }
        if let Some(v) = &self.port {
            parts.push(format!("port={}", v));
        }
        write!(f, "{}", parts.join(", "))
    }
}

/// Reads the native configuration at `path` and extracts overrides.
///
/// Never fails: every problem short of `control-enable: no` degrades to
/// "no overrides".
pub fn resolve<F: FileSystem>(fs: &F, path: Option<&Path>) -> Resolution {
    let Some(path) = path else {
        info!("'conf_path' not set, skipping parameters auto detection");
        return Resolution::none();
    };

    info!(path = %path.display(), "reading native configuration");
    let mut parser = NativeParser::new(fs);
    if let Err(e) = parser.parse_file(path, 0) {
        warn!(path = %path.display(), error = %e, "skipping parameters auto detection");
        return Resolution::none();
    }

    if parser.control_directives == 0 {
        debug!(path = %path.display(), "no remote-control configuration");
        return Resolution::none();
    }

    if parser.control_enable == Some(false) {
        info!("remote control is disabled in the configuration file");
        return Resolution::Disabled;
    }

    Resolution::Overrides(parser.overrides)
}

/// Control address for a `control-interface` value.
///
/// Domain socket paths are returned verbatim; bind-all addresses become
/// loopback since a client cannot connect to them.
pub fn control_address(interface: &str) -> String {
    if is_unix_socket(interface) {
        return interface.to_string();
    }
    let host = match interface {
        "0.0.0.0" => "127.0.0.1",
        "::" | "::0" | "0::0" => "::1",
        other => other,
    };
    join_host_port(host, DEFAULT_CONTROL_PORT)
}

fn join_host_port(host: &str, port: &str) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

fn split_host_port(address: &str) -> Option<(&str, &str)> {
    if let Some(rest) = address.strip_prefix('[') {
        let (host, port) = rest.split_once("]:")?;
        return Some((host, port));
    }
    let (host, port) = address.rsplit_once(':')?;
    (!host.contains(':')).then_some((host, port))
}

/// Error raised while reading a native configuration file.
#[derive(Debug)]
enum ConfError {
    Io(PathBuf, io::Error),
    Syntax(PathBuf, usize, String),
}

impl fmt::Display for ConfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfError::Io(path, e) => write!(f, "reading '{}': {}", path.display(), e),
            ConfError::Syntax(path, line, text) => {
                write!(f, "parsing '{}' line {}: '{}'", path.display(), line, text)
            }
        }
    }
}

struct NativeParser<'a, F: FileSystem> {
    fs: &'a F,
    visited: HashSet<PathBuf>,
    section: Option<String>,
    control_enable: Option<bool>,
    control_directives: usize,
    overrides: ServiceOverrides,
}

impl<'a, F: FileSystem> NativeParser<'a, F> {
    fn new(fs: &'a F) -> Self {
        Self {
            fs,
            visited: HashSet::new(),
            section: None,
            control_enable: None,
            control_directives: 0,
            overrides: ServiceOverrides::default(),
        }
    }

    fn parse_file(&mut self, path: &Path, depth: usize) -> Result<(), ConfError> {
        if !self.visited.insert(path.to_path_buf()) {
            debug!(path = %path.display(), "already parsed, skipping");
            return Ok(());
        }

        let content = self
            .fs
            .read_to_string(path)
            .map_err(|e| ConfError::Io(path.to_path_buf(), e))?;

        for (idx, raw) in content.lines().enumerate() {
            let line = strip_comment(raw).trim();
            if line.is_empty() {
                continue;
            }

            let Some((key, value)) = split_directive(line) else {
                return Err(ConfError::Syntax(path.to_path_buf(), idx + 1, line.to_string()));
            };

            if value.is_empty() {
                if SECTIONS.iter().any(|s| *s == key) {
                    self.section = Some(key.to_string());
                } else {
                    debug!(path = %path.display(), line = idx + 1, key, "empty directive, skipping");
                }
                continue;
            }

            let value = unquote(value);
            match key {
                "include" => self.include(value, depth),
                "include-toplevel" => {
                    self.section = None;
                    self.include(value, depth);
                    self.section = None;
                }
                _ => self.directive(key, value),
            }
        }

        Ok(())
    }

    fn include(&mut self, pattern: &str, depth: usize) {
        if depth + 1 > MAX_INCLUDE_DEPTH {
            warn!(include = pattern, "include nesting too deep, skipping");
            return;
        }

        // Included text is spliced in place: it continues the open section
        // and whatever section it opens stays open afterwards.
        for path in expand_include(self.fs, pattern) {
            if let Err(e) = self.parse_file(&path, depth + 1) {
                warn!(error = %e, "skipping include");
            }
        }
    }

    fn directive(&mut self, key: &str, value: &str) {
        match (self.section.as_deref(), key) {
            (Some(SECTION_SERVER), "statistics-cumulative") => {
                self.overrides.cumulative = parse_bool(key, value);
            }
            (Some(SECTION_REMOTE_CONTROL), _) => {
                self.control_directives += 1;
                self.control_directive(key, value);
            }
            _ => {}
        }
    }

    fn control_directive(&mut self, key: &str, value: &str) {
        match key {
            "control-enable" => self.control_enable = parse_bool(key, value),
            "control-use-cert" => self.overrides.use_tls = parse_bool(key, value),
            "control-key-file" => self.overrides.tls_key = Some(PathBuf::from(value)),
            "control-cert-file" => self.overrides.tls_cert = Some(PathBuf::from(value)),
            "server-cert-file" => self.overrides.tls_ca = Some(PathBuf::from(value)),
            "control-interface" => {
                if self.overrides.interface.is_none() {
                    self.overrides.interface = Some(value.to_string());
                } else {
                    debug!(interface = value, "ignoring additional control-interface");
                }
            }
            "control-port" => match value.parse::<u16>() {
                Ok(_) => self.overrides.port = Some(value.to_string()),
                Err(_) => warn!(value, "ignoring invalid control-port"),
            },
            _ => {}
        }
    }
}

/// Splits `key: value` or `key value`. A trailing-colon line is a section
/// header and yields an empty value. A bare token yields `None`.
fn split_directive(line: &str) -> Option<(&str, &str)> {
    let (key, value) = match line.split_once(':') {
        Some((key, value)) if !key.contains(char::is_whitespace) => (key, value),
        _ => {
            let (key, value) = line.split_once(char::is_whitespace)?;
            (key.trim_end_matches(':'), value)
        }
    };
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value.trim()))
}

fn strip_comment(line: &str) -> &str {
    let mut quote = None;
    for (i, c) in line.char_indices() {
        match (c, quote) {
            ('"' | '\'', None) => quote = Some(c),
            (c, Some(q)) if c == q => quote = None,
            ('#', None) => return &line[..i],
            _ => {}
        }
    }
    line
}

fn unquote(value: &str) -> &str {
    for q in ['"', '\''] {
        if let Some(inner) = value.strip_prefix(q).and_then(|v| v.strip_suffix(q)) {
            return inner;
        }
    }
    value
}

fn parse_bool(key: &str, value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "yes" => Some(true),
        "no" => Some(false),
        _ => {
            warn!(key, value, "expected 'yes' or 'no', ignoring");
            None
        }
    }
}

/// Paths named by an include pattern. Only the final component may carry
/// `*` wildcards.
fn expand_include<F: FileSystem>(fs: &F, pattern: &str) -> Vec<PathBuf> {
    let path = Path::new(pattern);
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return vec![path.to_path_buf()];
    };
    if !name.contains('*') {
        return vec![path.to_path_buf()];
    }

    let dir = path.parent().unwrap_or(Path::new("/"));
    let mut matches: Vec<PathBuf> = match fs.read_dir(dir) {
        Ok(entries) => entries
            .into_iter()
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| wildcard_match(name, n))
            })
            .collect(),
        Err(e) => {
            warn!(include = pattern, error = %e, "cannot expand include");
            Vec::new()
        }
    };
    matches.sort();
    matches
}

fn wildcard_match(pattern: &str, name: &str) -> bool {
    let mut parts = pattern.split('*');
    let first = parts.next().unwrap_or("");
    let Some(mut rest) = name.strip_prefix(first) else {
        return false;
    };

    let parts: Vec<&str> = parts.collect();
    let Some((last, middle)) = parts.split_last() else {
        return rest.is_empty();
    };
    for part in middle {
        match rest.find(part) {
            Some(pos) => rest = &rest[pos + part.len()..],
            None => return false,
        }
    }
    rest.len() >= last.len() && rest.ends_with(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;

    const CONF: &str = "/etc/unbound/unbound.conf";

    fn resolve_str(content: &str) -> Resolution {
        let mut fs = MockFs::new();
        fs.add_file(CONF, content);
        resolve(&fs, Some(Path::new(CONF)))
    }

    fn overrides(content: &str) -> ServiceOverrides {
        match resolve_str(content) {
            Resolution::Overrides(o) => o,
            Resolution::Disabled => panic!("unexpected Disabled"),
        }
    }

    #[test]
    fn no_path_means_no_overrides() {
        let fs = MockFs::new();
        assert_eq!(resolve(&fs, None), Resolution::none());
    }

    #[test]
    fn missing_or_unreadable_file_means_no_overrides() {
        let mut fs = MockFs::new();
        assert_eq!(resolve(&fs, Some(Path::new(CONF))), Resolution::none());

        fs.add_unreadable(CONF);
        assert_eq!(resolve(&fs, Some(Path::new(CONF))), Resolution::none());
    }

    #[test]
    fn malformed_file_means_no_overrides() {
        let o = overrides("remote-control:\n  control-port: 9000\n  garbage\n");
        assert!(o.is_empty());
    }

    #[test]
    fn absent_or_empty_control_block_means_no_overrides() {
        assert!(overrides("server:\n  statistics-cumulative: yes\n").is_empty());
        assert!(overrides("server:\n  verbosity: 1\nremote-control:\n").is_empty());
        assert!(overrides("").is_empty());
    }

    #[test]
    fn control_disabled() {
        let res = resolve_str("remote-control:\n  control-enable: no\n");
        assert_eq!(res, Resolution::Disabled);
    }

    #[test]
    fn control_enable_alone_has_no_overrides() {
        assert!(overrides("remote-control:\n  control-enable: yes\n").is_empty());
    }

    #[test]
    fn extracts_all_recognised_directives() {
        let o = overrides(
            r#"
# resolver configuration
server:
    verbosity: 1
    statistics-cumulative: yes   # keep totals
remote-control:
    control-enable: yes
    control-use-cert: "no"
    control-key-file: "/etc/unbound/ctl.key"
    control-cert-file: '/etc/unbound/ctl.pem'
    server-cert-file: /etc/unbound/unbound_server.pem
    control-interface: 10.0.0.1
    control-interface: 10.0.0.2
    control-port: 9953
"#,
        );
        assert_eq!(
            o,
            ServiceOverrides {
                cumulative: Some(true),
                use_tls: Some(false),
                tls_key: Some(PathBuf::from("/etc/unbound/ctl.key")),
                tls_cert: Some(PathBuf::from("/etc/unbound/ctl.pem")),
                tls_ca: Some(PathBuf::from("/etc/unbound/unbound_server.pem")),
                interface: Some("10.0.0.1".to_string()),
                port: Some("9953".to_string()),
            }
        );
    }

    #[test]
    fn directives_in_other_sections_are_ignored() {
        let o = overrides(
            "forward-zone:\n  control-port: 1\nremote-control:\n  control-use-cert: yes\n",
        );
        assert_eq!(o.port, None);
        assert_eq!(o.use_tls, Some(true));
    }

    #[test]
    fn space_separated_directives() {
        let o = overrides("remote-control:\n  control-port 9000\n");
        assert_eq!(o.port.as_deref(), Some("9000"));
    }

    #[test]
    fn invalid_values_are_skipped() {
        let o = overrides("remote-control:\n  control-port: http\n  control-use-cert: maybe\n");
        assert_eq!(o.port, None);
        assert_eq!(o.use_tls, None);
    }

    #[test]
    fn follows_includes_with_wildcards() {
        let mut fs = MockFs::new();
        fs.add_file(
            CONF,
            "server:\n  verbosity: 1\ninclude: \"/etc/unbound/conf.d/*.conf\"\n",
        );
        fs.add_file(
            "/etc/unbound/conf.d/10-control.conf",
            "remote-control:\n  control-interface: /run/unbound.ctl\n",
        );
        fs.add_file(
            "/etc/unbound/conf.d/20-port.conf",
            "remote-control:\n  control-port: 9000\n",
        );
        fs.add_file("/etc/unbound/conf.d/README", "not a config\n");

        let Resolution::Overrides(o) = resolve(&fs, Some(Path::new(CONF))) else {
            panic!("expected overrides");
        };
        assert_eq!(o.interface.as_deref(), Some("/run/unbound.ctl"));
        assert_eq!(o.port.as_deref(), Some("9000"));
    }

    #[test]
    fn include_cycles_and_missing_includes_are_tolerated() {
        let mut fs = MockFs::new();
        fs.add_file(
            CONF,
            "include: /etc/unbound/a.conf\ninclude: /etc/unbound/missing.conf\n",
        );
        fs.add_file(
            "/etc/unbound/a.conf",
            "include: /etc/unbound/unbound.conf\nremote-control:\n  control-enable: no\n",
        );

        assert_eq!(resolve(&fs, Some(Path::new(CONF))), Resolution::Disabled);
    }

    #[test]
    fn included_section_stays_open() {
        let mut fs = MockFs::new();
        fs.add_file(
            CONF,
            "server:\ninclude: /etc/unbound/b.conf\n  control-port: 9000\n",
        );
        fs.add_file("/etc/unbound/b.conf", "remote-control:\n  control-enable: yes\n");

        let Resolution::Overrides(o) = resolve(&fs, Some(Path::new(CONF))) else {
            panic!("expected overrides");
        };
        assert_eq!(o.port.as_deref(), Some("9000"));
    }

    #[test]
    fn included_file_inherits_open_section() {
        let mut fs = MockFs::new();
        fs.add_file(
            CONF,
            "remote-control:\n  include: /etc/unbound/port.conf\nserver:\n  control-interface: /run/x.ctl\n",
        );
        fs.add_file("/etc/unbound/port.conf", "control-port: 9000\n");

        let Resolution::Overrides(o) = resolve(&fs, Some(Path::new(CONF))) else {
            panic!("expected overrides");
        };
        assert_eq!(o.port.as_deref(), Some("9000"));
        assert_eq!(o.interface, None);
    }

    #[test]
    fn include_toplevel_closes_the_section() {
        let mut fs = MockFs::new();
        fs.add_file(
            CONF,
            "remote-control:\ninclude-toplevel: /etc/unbound/top.conf\n  control-port: 9000\n",
        );
        fs.add_file(
            "/etc/unbound/top.conf",
            "control-interface: /run/x.ctl\nremote-control:\n  control-use-cert: no\n",
        );

        let Resolution::Overrides(o) = resolve(&fs, Some(Path::new(CONF))) else {
            panic!("expected overrides");
        };
        assert_eq!(o.use_tls, Some(false));
        assert_eq!(o.interface, None);
        assert_eq!(o.port, None);
    }

    #[test]
    fn wildcard_include_of_empty_directory() {
        let mut fs = MockFs::new();
        fs.add_file(
            CONF,
            "remote-control:\n  control-port: 9000\ninclude: /etc/unbound/conf.d/*.conf\n",
        );
        fs.add_dir("/etc/unbound/conf.d");

        let Resolution::Overrides(o) = resolve(&fs, Some(Path::new(CONF))) else {
            panic!("expected overrides");
        };
        assert_eq!(o.port.as_deref(), Some("9000"));
    }

    #[test]
    fn empty_directive_is_not_a_section() {
        let o = overrides("remote-control:\n  control-interface:\n  control-port: 9000\n");
        assert_eq!(o.port.as_deref(), Some("9000"));
        assert_eq!(o.interface, None);

        let o = overrides(
            "remote-control:\n  control-enable: yes\nserver:\n  module-config:\n  statistics-cumulative: yes\n",
        );
        assert_eq!(o.cumulative, Some(true));
    }

    #[test]
    fn control_address_translates_wildcards() {
        assert_eq!(control_address("0.0.0.0"), "127.0.0.1:8953");
        assert_eq!(control_address("::"), "[::1]:8953");
        assert_eq!(control_address("::0"), "[::1]:8953");
        assert_eq!(control_address("192.168.1.5"), "192.168.1.5:8953");
        assert_eq!(control_address("/run/unbound.ctl"), "/run/unbound.ctl");
    }

    #[test]
    fn apply_wildcard_interface_with_port() {
        let mut config = UnboundConfig::default();
        let o = ServiceOverrides {
            interface: Some("0.0.0.0".to_string()),
            port: Some("9000".to_string()),
            ..Default::default()
        };
        o.apply(&mut config);
        assert_eq!(config.address, "127.0.0.1:9000");
    }

    #[test]
    fn apply_ipv6_interface_with_port() {
        let mut config = UnboundConfig::default();
        let o = ServiceOverrides {
            interface: Some("::1".to_string()),
            port: Some("9000".to_string()),
            ..Default::default()
        };
        o.apply(&mut config);
        assert_eq!(config.address, "[::1]:9000");
    }

    #[test]
    fn apply_unix_interface_ignores_port() {
        let mut config = UnboundConfig::default();
        let o = ServiceOverrides {
            interface: Some("/run/unbound.ctl".to_string()),
            port: Some("9000".to_string()),
            ..Default::default()
        };
        o.apply(&mut config);
        assert_eq!(config.address, "/run/unbound.ctl");
    }

    #[test]
    fn apply_port_only_keeps_configured_host() {
        let mut config = UnboundConfig {
            address: "10.1.1.1:8953".to_string(),
            ..UnboundConfig::default()
        };
        let o = ServiceOverrides {
            port: Some("9953".to_string()),
            ..Default::default()
        };
        o.apply(&mut config);
        assert_eq!(config.address, "10.1.1.1:9953");
    }

    #[test]
    fn apply_touches_only_present_fields() {
        let mut config = UnboundConfig::default();
        let before = config.clone();
        ServiceOverrides::default().apply(&mut config);
        assert_eq!(config, before);

        let o = ServiceOverrides {
            cumulative: Some(true),
            use_tls: Some(false),
            ..Default::default()
        };
        o.apply(&mut config);
        assert!(config.cumulative_stats);
        assert!(!config.use_tls);
        assert_eq!(config.tls_cert, before.tls_cert);
        assert_eq!(config.address, before.address);
    }

    #[test]
    fn display_lists_present_fields() {
        let o = ServiceOverrides {
            cumulative: Some(false),
            port: Some("9000".to_string()),
            ..Default::default()
        };
        assert_eq!(o.to_string(), "cumulative=false, port=9000");
    }

    #[test]
    fn wildcard_matching() {
        assert!(wildcard_match("*.conf", "a.conf"));
        assert!(wildcard_match("*", "anything"));
        assert!(wildcard_match("10-*.conf", "10-control.conf"));
        assert!(wildcard_match("a*b*c", "aXbYc"));
        assert!(!wildcard_match("*.conf", "README"));
        assert!(!wildcard_match("*.conf", "x.conf.bak"));
        assert!(!wildcard_match("ab*ab", "ab"));
    }

    #[test]
    fn comments_inside_quotes_are_kept() {
        let o = overrides("remote-control:\n  control-key-file: \"/etc/un#bound.key\" # c\n");
        assert_eq!(o.tls_key, Some(PathBuf::from("/etc/un#bound.key")));
    }
}
