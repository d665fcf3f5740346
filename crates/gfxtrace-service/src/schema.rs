//! Self-description the server publishes through `get_schema`.

use rpclib_core::{binary_object, Value};

binary_object! {
    /// Every entity type and constant set the server knows.
    pub struct Schema("schema.Message") {
        pub classes: Vec<Entity>,
        pub constants: Vec<ConstantSet>,
    }
}

binary_object! {
    /// Description of one server-side type.
    pub struct Entity("schema.Entity") {
        pub package: String,
        pub identity: String,
        pub version: String,
        pub display: String,
        pub fields: Vec<SchemaField>,
    }
}

binary_object! {
    pub struct SchemaField("schema.Field") {
        pub declared: String,
        pub type_name: String,
    }
}

binary_object! {
    /// Named values of one enum-like type.
    pub struct ConstantSet("schema.ConstantSet") {
        pub type_name: String,
        pub entries: Vec<Constant>,
    }
}

binary_object! {
    pub struct Constant("schema.Constant") {
        pub name: String,
        pub value: Value,
    }
}

impl Schema {
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.constants.is_empty()
    }

    /// Find an entity by package and identity.
    pub fn entity(&self, package: &str, identity: &str) -> Option<&Entity> {
        self.classes
            .iter()
            .find(|e| e.package == package && e.identity == identity)
    }

    /// Find the constant set for `type_name`.
    pub fn constants_for(&self, type_name: &str) -> Option<&ConstantSet> {
        self.constants.iter().find(|c| c.type_name == type_name)
    }
}

impl ConstantSet {
    /// Name of the constant holding `value`, if any.
    pub fn name_of(&self, value: &Value) -> Option<&str> {
        self.entries
            .iter()
            .find(|c| &c.value == value)
            .map(|c| c.name.as_str())
    }
}
