use crate::Entity;

/// A named argument passed to a query or an invoke operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter<V> {
    pub name: String,
    pub value: V,
}

impl<V> Parameter<V> {
    pub fn new(name: impl Into<String>, value: V) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Describes a load request. Composing the query on the server side is the
/// transport's business; the runtime only forwards it.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityQuery<V> {
    pub query_name: String,
    pub parameters: Vec<Parameter<V>>,
    pub include_total_count: bool,
}

impl<V> EntityQuery<V> {
    pub fn new(query_name: impl Into<String>) -> Self {
        Self {
            query_name: query_name.into(),
            parameters: Vec::new(),
            include_total_count: false,
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: V) -> Self {
        self.parameters.push(Parameter::new(name, value));
        self
    }

    pub fn with_total_count(mut self, include_total_count: bool) -> Self {
        self.include_total_count = include_total_count;
        self
    }
}

/// What a transport hands back for a query: the root entities, any entities
/// included alongside them, and optionally the unpaged total.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult<E: Entity> {
    pub entities: Vec<E>,
    pub included_entities: Vec<E>,
    pub total_count: Option<usize>,
}

impl<E: Entity> QueryResult<E> {
    pub fn new(entities: Vec<E>) -> Self {
        Self {
            entities,
            included_entities: Vec::new(),
            total_count: None,
        }
    }

    pub fn with_included(mut self, included_entities: Vec<E>) -> Self {
        self.included_entities = included_entities;
        self
    }

    pub fn with_total_count(mut self, total_count: usize) -> Self {
        self.total_count = Some(total_count);
        self
    }
}

/// A remote method call.
#[derive(Debug, Clone, PartialEq)]
pub struct InvokeRequest<V> {
    pub operation_name: String,
    pub parameters: Vec<Parameter<V>>,
    pub has_side_effects: bool,
}

impl<V> InvokeRequest<V> {
    pub fn new(operation_name: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
            parameters: Vec::new(),
            has_side_effects: true,
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: V) -> Self {
        self.parameters.push(Parameter::new(name, value));
        self
    }

    pub fn with_side_effects(mut self, has_side_effects: bool) -> Self {
        self.has_side_effects = has_side_effects;
        self
    }
}
