//! Expression building for field conversions
//!
//! A conversion is written as an element transform over a non-optional
//! input. The helpers here lift it over `Option` on either side so generated
//! code reads the same whether fields are nullable or not.

/// How to read the input side of a conversion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Access {
    /// Rust expression producing the value
    pub expr: String,
    /// Whether the expression is an `Option`
    pub pointer: bool,
    /// Whether the expression is a place (a struct field) rather than a temporary
    pub place: bool,
}

impl Access {
    /// Read a struct field
    pub fn field(expr: impl Into<String>, pointer: bool) -> Self {
        Self {
            expr: expr.into(),
            pointer,
            place: true,
        }
    }

    /// Read a computed value
    pub fn computed(expr: impl Into<String>, pointer: bool) -> Self {
        Self {
            expr: expr.into(),
            pointer,
            place: false,
        }
    }

    /// Expression usable as a method receiver
    pub fn receiver(&self) -> String {
        if self.place {
            self.expr.clone()
        } else {
            format!("({})", self.expr)
        }
    }

    /// Owned copy of the value
    pub fn owned(&self, copy: bool) -> String {
        if copy || !self.place {
            self.expr.clone()
        } else {
            format!("{}.clone()", self.expr)
        }
    }
}

/// Shape of an element transform
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Transform {
    /// The transform returns `Result`
    pub fallible: bool,
    /// The transform returns `Option` (it can report absence itself)
    pub yields_presence: bool,
}

/// Apply an element transform to `input`, producing a value that is an
/// `Option` exactly when `out_pointer` is set
///
/// Fallible transforms produce a `Result` of that value.
pub fn lift(input: &Access, out_pointer: bool, transform: Transform, element: impl Fn(&str) -> String) -> String {
    let Transform {
        fallible,
        yields_presence,
    } = transform;

    if !input.pointer {
        let applied = element(&input.receiver());
        return match (out_pointer, yields_presence, fallible) {
            (false, false, _) => applied,
            (false, true, false) => format!("{}.unwrap_or_default()", applied),
            (false, true, true) => format!("{}.map(Option::unwrap_or_default)", applied),
            (true, false, false) => format!("Some({})", applied),
            (true, false, true) => format!("{}.map(Some)", applied),
            (true, true, _) => applied,
        };
    }

    let mapped = format!("{}.as_ref().map(|v| {})", input.receiver(), element("v"));
    let chained = format!("{}.as_ref().and_then(|v| {})", input.receiver(), element("v"));
    match (out_pointer, yields_presence, fallible) {
        (true, false, false) => mapped,
        (true, false, true) => format!("{}.transpose()", mapped),
        (true, true, false) => chained,
        (true, true, true) => format!("{}.transpose().map(Option::flatten)", mapped),
        (false, false, false) => format!("{}.unwrap_or_default()", mapped),
        (false, false, true) => format!("{}.transpose().map(Option::unwrap_or_default)", mapped),
        (false, true, false) => format!("{}.unwrap_or_default()", chained),
        (false, true, true) => format!(
            "{}.transpose().map(|v| v.flatten().unwrap_or_default())",
            mapped
        ),
    }
}

/// Assign between identical Rust types, adjusting only nullability
pub fn assign(input: &Access, out_pointer: bool, copy: bool) -> String {
    let value = input.owned(copy);
    match (input.pointer, out_pointer) {
        (true, true) | (false, false) => value,
        (true, false) if input.place => format!("{}.unwrap_or_default()", value),
        (true, false) => format!("{}.unwrap_or_default()", input.receiver()),
        (false, true) => format!("Some({})", value),
    }
}

/// Numeric cast between primitive types, adjusting nullability
pub fn cast(input: &Access, out_pointer: bool, rust_type: &str) -> String {
    let receiver = input.receiver();
    match (input.pointer, out_pointer) {
        (false, false) => format!("{} as {}", receiver, rust_type),
        (false, true) => format!("Some({} as {})", receiver, rust_type),
        (true, true) => format!("{}.map(|v| v as {})", receiver, rust_type),
        (true, false) => format!("{}.map(|v| v as {}).unwrap_or_default()", receiver, rust_type),
    }
}

/// Element-wise cast of a list
pub fn cast_list(input: &Access, rust_type: &str) -> String {
    format!("{}.iter().map(|v| *v as {}).collect()", input.receiver(), rust_type)
}

/// Value-wise cast of a map
pub fn cast_map_values(input: &Access, rust_type: &str) -> String {
    format!(
        "{}.iter().map(|(k, v)| (k.clone(), *v as {})).collect()",
        input.receiver(),
        rust_type
    )
}
