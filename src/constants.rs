//! Global constants used throughout the tplforge codebase.
//!
//! Directory conventions for the template library, render-context namespace
//! names and recursion limits live here so the resolver, renderer and tests
//! agree on them.

/// Directory holding platform-specific templates (`platforms/<platform>/<type>.<ext>`).
pub const PLATFORMS_DIR: &str = "platforms";

/// Directory holding tech-stack defaults (`tech-stacks/<stack>/defaults.<ext>`).
pub const TECH_STACKS_DIR: &str = "tech-stacks";

/// File stem of a tech-stack default document.
pub const DEFAULTS_DOCUMENT: &str = "defaults";

/// Tech stack whose defaults act as the generic last-resort candidate.
pub const CUSTOM_TECH_STACK: &str = "custom";

/// Location (without extension) of the shared base document.
pub const DEFAULT_BASE_DOCUMENT: &str = "base/default";

/// Default extension of template files.
pub const DEFAULT_TEMPLATE_EXTENSION: &str = "yaml";

/// Default directory searched for templates, relative to the working directory.
pub const DEFAULT_TEMPLATE_ROOT: &str = "templates";

/// Location recorded in resolution metadata when the built-in default was used.
pub const BUILT_IN_LOCATION: &str = "<built-in default>";

/// Maximum number of base documents followed through `meta.inherits_from`.
pub const MAX_INHERITANCE_DEPTH: usize = 5;

/// Maximum nesting depth for section overrides rendered as templates.
///
/// Section bodies supplied through preferences may contain further sections;
/// this bounds the recursion when preferences reference each other.
pub const MAX_RENDER_DEPTH: usize = 10;

/// Environment variable naming an alternative configuration file.
pub const CONFIG_ENV: &str = "TPLFORGE_CONFIG";

/// Environment variable overriding the template root directory.
pub const TEMPLATE_ROOT_ENV: &str = "TPLFORGE_TEMPLATE_ROOT";

/// Render-context namespace describing the subject of the design.
pub const DESIGN_NAMESPACE: &str = "design";

/// Render-context namespace describing the project.
pub const PROJECT_NAMESPACE: &str = "project";

/// Render-context namespace holding computed metrics.
pub const CALCULATED_NAMESPACE: &str = "calculated";

/// Preference namespaces consulted for `{% section %}` overrides, most specific first.
pub const PREFERENCE_NAMESPACES: &[&str] = &["user", "team", "organization"];

/// Key under a preference namespace that holds section overrides.
pub const SECTIONS_KEY: &str = "sections";
