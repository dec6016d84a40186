//! The `SopDocument` model: metadata, task tree, field rules, and the
//! filename-component annotations used by `claire-submissions` to compose
//! object keys.

use serde::{Deserialize, Serialize};

/// Publication status of an SOP document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SopStatus {
    /// Still being authored; not eligible for submission.
    Draft,
    /// The only status that accepts ordinary submissions.
    Published,
    /// Immutable and retained, but requires an override permission to submit against.
    Deprecated,
}

/// Authorship and lifecycle metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SopMetadata {
    /// Human-readable title.
    pub title: String,
    /// Author's display name or id.
    pub author: String,
    /// Approver's display name or id, if approved.
    #[serde(default)]
    pub approver: Option<String>,
    /// Date the document was published, if any.
    #[serde(default)]
    pub published_date: Option<chrono::NaiveDate>,
    /// Current status.
    pub status: SopStatus,
}

/// A field's data type, which drives the §4.5 type-coercion/validation rule
/// applied to the corresponding value in a submission body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum FieldType {
    /// Free text, optionally constrained by `pattern`.
    Text,
    /// A number, optionally constrained by `min`/`max`.
    Number {
        /// Inclusive lower bound.
        #[serde(default)]
        min: Option<f64>,
        /// Inclusive upper bound.
        #[serde(default)]
        max: Option<f64>,
    },
    /// A boolean flag.
    Boolean,
    /// A date in `YYYY-MM-DD` form.
    Date,
    /// One of `values`.
    Enum {
        /// The allowed values.
        values: Vec<String>,
    },
    /// A reference to a previously uploaded file.
    Attachment {
        /// Media types accepted for this attachment, beyond the global allowlist.
        #[serde(default)]
        allowed_media_types: Vec<String>,
        /// Size ceiling for this attachment, beyond the global file size limit.
        #[serde(default)]
        max_size_bytes: Option<u64>,
    },
}

/// One field definition within a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    /// Dotted path within the submission body this field occupies.
    pub path: String,
    /// Display label.
    pub label: String,
    /// The field's data type and type-specific constraints.
    #[serde(flatten)]
    pub field_type: FieldType,
    /// Whether the field must be present for a submission to validate.
    #[serde(default)]
    pub required: bool,
    /// A regular expression the value must match, for text fields.
    #[serde(default)]
    pub pattern: Option<String>,
}

/// A cross-field rule evaluated after every individual field passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum CrossFieldRule {
    /// Either all of `fields` are present, or none are.
    AllOrNone {
        /// The field paths that must rise or fall together.
        fields: Vec<String>,
    },
    /// `then_field` is required whenever `when_field` equals `when_value`.
    RequiredIf {
        /// The field whose value gates the requirement.
        when_field: String,
        /// The value that triggers the requirement.
        when_value: String,
        /// The field required when the condition holds.
        then_field: String,
    },
}

/// One task within a task group: a named collection of fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Stable task identifier.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Fields collected by this task.
    pub fields: Vec<Field>,
}

/// A group of related tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskGroup {
    /// Stable group identifier.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Tasks within this group.
    pub tasks: Vec<Task>,
}

/// One field selected for interpolation into a submission's object key, in
/// the declared order they appear in this list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilenameComponent {
    /// Dotted path of the source field.
    pub field_path: String,
    /// Lowercase the value before composing the key.
    #[serde(default)]
    pub lowercase: bool,
}

/// A complete SOP document: metadata, task tree, field rules, and filename
/// components, identified by `(sop_id, version)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SopDocument {
    /// Opaque, org-unique identifier.
    pub sop_id: String,
    /// Monotonic, semver-like version string.
    pub version: String,
    /// Authorship and lifecycle metadata.
    pub metadata: SopMetadata,
    /// Task groups, in declared order.
    pub task_groups: Vec<TaskGroup>,
    /// Cross-field rules evaluated after per-field checks.
    #[serde(default)]
    pub cross_field_rules: Vec<CrossFieldRule>,
    /// Fields selected for object-key interpolation, in declared order.
    #[serde(default)]
    pub filename_components: Vec<FilenameComponent>,
}

impl SopDocument {
    /// Parse a document from its YAML representation.
    ///
    /// # Errors
    /// Returns [`crate::error::SopError::Malformed`] if `yaml` does not
    /// parse into a well-formed document.
    pub fn from_yaml(yaml: &str) -> Result<Self, crate::error::SopError> {
        serde_yaml::from_str(yaml).map_err(|e| crate::error::SopError::Malformed(e.to_string()))
    }

    /// Iterate over every field across every task group, in declared order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.task_groups
            .iter()
            .flat_map(|group| group.tasks.iter())
            .flat_map(|task| task.fields.iter())
    }

    /// Look up a field by its dotted path.
    #[must_use]
    pub fn field(&self, path: &str) -> Option<&Field> {
        self.fields().find(|f| f.path == path)
    }
}
