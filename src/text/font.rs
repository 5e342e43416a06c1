use std::path::PathBuf;
use std::sync::Arc;

/// Families tried, in order, after the configured family when probing installed fonts.
const FALLBACK_FAMILIES: &[&str] = &[
    "Noto Sans CJK SC",
    "Microsoft YaHei",
    "PingFang SC",
    "Noto Sans",
    "DejaVu Sans",
    "Liberation Sans",
    "Arial",
];

/// Caller-facing font preferences.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FontSpec {
    /// Explicit font file (`.ttf`/`.otf`/`.ttc`). Tried first.
    pub path: Option<PathBuf>,
    /// Installed family name to look up when `path` is unset or unusable.
    pub family: Option<String>,
}

/// Where the font actually used for rendering came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FontOrigin {
    File(PathBuf),
    System { family: String },
    Builtin,
}

/// Raw outline font bytes plus the face index inside a collection.
#[derive(Clone)]
pub struct FontFace {
    pub bytes: Arc<Vec<u8>>,
    pub index: u32,
    pub origin: FontOrigin,
}

impl std::fmt::Debug for FontFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontFace")
            .field("bytes_len", &self.bytes.len())
            .field("index", &self.index)
            .field("origin", &self.origin)
            .finish()
    }
}

/// Outcome of font resolution. Never an error: the built-in font is always available.
#[derive(Clone, Debug)]
pub enum ResolvedFont {
    Outline(FontFace),
    Builtin,
}

impl ResolvedFont {
    pub fn origin(&self) -> FontOrigin {
        match self {
            Self::Outline(face) => face.origin.clone(),
            Self::Builtin => FontOrigin::Builtin,
        }
    }
}

/// Resolve the caption font: configured file, then installed families, then the built-in font.
#[tracing::instrument(skip_all, fields(path = ?spec.path, family = ?spec.family))]
pub fn resolve_font(spec: &FontSpec) -> ResolvedFont {
    if let Some(path) = &spec.path {
        match std::fs::read(path) {
            Ok(bytes) if !bytes.is_empty() => {
                tracing::debug!(path = %path.display(), "using configured font file");
                return ResolvedFont::Outline(FontFace {
                    bytes: Arc::new(bytes),
                    index: 0,
                    origin: FontOrigin::File(path.clone()),
                });
            }
            Ok(_) => tracing::warn!(path = %path.display(), "configured font file is empty"),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "configured font file unreadable")
            }
        }
    }

    if let Some(face) = lookup_system_font(spec.family.as_deref()) {
        return ResolvedFont::Outline(face);
    }

    tracing::warn!("no usable outline font found; falling back to the built-in bitmap font");
    ResolvedFont::Builtin
}

/// Look up an installed font through the platform font database.
pub fn lookup_system_font(family: Option<&str>) -> Option<FontFace> {
    use usvg::fontdb;

    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    if db.is_empty() {
        return None;
    }

    let mut families: Vec<fontdb::Family<'_>> = Vec::new();
    if let Some(name) = family {
        families.push(fontdb::Family::Name(name));
    }
    families.extend(FALLBACK_FAMILIES.iter().map(|&n| fontdb::Family::Name(n)));
    families.push(fontdb::Family::SansSerif);

    let id = db.query(&fontdb::Query {
        families: &families,
        ..fontdb::Query::default()
    })?;
    let family_name = db
        .face(id)
        .and_then(|f| f.families.first().map(|(name, _)| name.clone()))
        .unwrap_or_default();
    let (bytes, index) = db.with_face_data(id, |data, index| (data.to_vec(), index))?;

    if let Some(wanted) = family
        && !family_name.eq_ignore_ascii_case(wanted)
    {
        tracing::warn!(wanted, resolved = %family_name, "configured font family not installed");
    }
    tracing::debug!(family = %family_name, "using installed font");

    Some(FontFace {
        bytes: Arc::new(bytes),
        index,
        origin: FontOrigin::System {
            family: family_name,
        },
    })
}
