pub mod introspect;
pub mod ir;

pub use ir::{
    apply_constraints, explicit_indexes, find_enum, group_indexes, Column, ConstraintKind,
    ConstraintRow, EnumDef, EnumMetadata, ForeignKey, IndexColumnRow, IndexDef, Reference,
};
