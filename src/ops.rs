//! Registry of the extra predicate operators beyond the standard
//! comparison/logical set. Pure data: the serializer consults this table to
//! decide whether an operator has an N1QL emission template at all.

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum QueryOp {
    /// Proximity search on a geo field.
    Near,
    /// Geo bounding-box containment.
    GeoWithinBox,
    /// Element match over an embedded collection.
    ElemMatch,
    /// Guaranteed-false filter, used to short-circuit empty joins.
    NoMatch,
    /// Spherical proximity search.
    NearSphere,
}

impl QueryOp {
    pub const ALL: [QueryOp; 5] = [
        QueryOp::Near,
        QueryOp::GeoWithinBox,
        QueryOp::ElemMatch,
        QueryOp::NoMatch,
        QueryOp::NearSphere,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            QueryOp::Near => "NEAR",
            QueryOp::GeoWithinBox => "GEO_WITHIN_BOX",
            QueryOp::ElemMatch => "ELEM_MATCH",
            QueryOp::NoMatch => "NO_MATCH",
            QueryOp::NearSphere => "NEAR_SPHERE",
        }
    }

    /// Operand arity: the collection/field operand plus value operands.
    pub const fn arity(self) -> usize {
        match self {
            QueryOp::Near | QueryOp::NearSphere => 3,
            QueryOp::GeoWithinBox => 5,
            QueryOp::ElemMatch => 2,
            QueryOp::NoMatch => 0,
        }
    }

    /// Whether the N1QL serializer carries an emission template for this
    /// operator. Unsupported operators fail at compile time, not execution.
    pub const fn is_supported(self) -> bool {
        matches!(self, QueryOp::ElemMatch | QueryOp::NoMatch)
    }
}
