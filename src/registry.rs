//! Global map from type identity to published class descriptor.
//!
//! The registry is written only while classes are published and read by
//! every dispatch afterwards. A class is reachable under its own identity
//! and, in held mode, under the identities of its held and const-held types.

use std::sync::Arc;

use nativebind_core::{OperatorKind, ParamType, RegistrationError, TypeHash};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

use crate::class::{BaseEdge, ClassBuilder, ClassDescriptor, ClassDraft};
use crate::config::EngineConfig;
use crate::overload::Overload;

/// Map from type identity to class descriptor.
#[derive(Default)]
pub struct ClassRegistry {
    classes: FxHashMap<TypeHash, Arc<ClassDescriptor>>,
    next_sequence: u64,
}

impl ClassRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Class bound to `identity`, which may be a native, held or const-held type.
    pub fn find(&self, identity: TypeHash) -> Option<&Arc<ClassDescriptor>> {
        self.classes.get(&identity)
    }

    /// Class registered under `name`.
    pub fn find_by_name(&self, name: &str) -> Option<&Arc<ClassDescriptor>> {
        self.classes().find(|class| class.name() == name)
    }

    /// Check if `identity` is bound.
    pub fn contains(&self, identity: TypeHash) -> bool {
        self.classes.contains_key(&identity)
    }

    /// Number of bound identities, aliases included.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Check if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Every published class once, without aliases.
    pub fn classes(&self) -> impl Iterator<Item = &Arc<ClassDescriptor>> {
        self.classes
            .iter()
            .filter(|(identity, class)| **identity == class.type_hash())
            .map(|(_, class)| class)
    }

    /// Class name for diagnostics, or a placeholder for unbound identities.
    pub fn class_name(&self, identity: TypeHash) -> String {
        match self.find(identity) {
            Some(class) => class.name().to_string(),
            None => format!("<unregistered {identity}>"),
        }
    }

    /// Bind `identity` to `class` unless it is already bound.
    ///
    /// Returns `false` and keeps the existing binding when `identity` is taken.
    pub fn register(&mut self, identity: TypeHash, class: Arc<ClassDescriptor>) -> bool {
        if self.classes.contains_key(&identity) {
            return false;
        }
        self.classes.insert(identity, class);
        true
    }

    // =========================================================================
    // Publishing
    // =========================================================================

    /// Validate a builder, freeze it into a descriptor and bind its identities.
    ///
    /// Publishing the same native type twice is a programming error: it trips
    /// a debug assertion, and release builds keep the first binding and return
    /// [`RegistrationError::AlreadyPublished`].
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn publish<T: 'static>(
        &mut self,
        builder: ClassBuilder<T>,
        config: &EngineConfig,
    ) -> Result<Arc<ClassDescriptor>, RegistrationError> {
        self.publish_draft(builder.into_draft(), config)
    }

    fn publish_draft(
        &mut self,
        draft: ClassDraft,
        config: &EngineConfig,
    ) -> Result<Arc<ClassDescriptor>, RegistrationError> {
        let ClassDraft {
            name,
            type_hash,
            holder,
            bases,
            methods,
            properties,
            operators,
            constructors,
        } = draft;

        if let Some(existing) = self.classes.get(&type_hash) {
            debug_assert!(
                false,
                "class '{name}' is already published as '{}'",
                existing.name()
            );
            return Err(RegistrationError::AlreadyPublished { class: name });
        }

        if holder.storage_layout().size() == 0 {
            return Err(RegistrationError::InvalidHolder {
                class: name,
                reason: format!("{} storage has zero size", holder.family()),
            });
        }

        let mut base_edges = Vec::with_capacity(bases.len());
        for (base, offset) in bases {
            let Some(descriptor) = self.classes.get(&base) else {
                return Err(RegistrationError::UnknownBase { class: name, base });
            };
            base_edges.push(BaseEdge {
                base: Arc::clone(descriptor),
                offset,
            });
        }

        for (kind, overload) in &operators {
            validate_operator(&name, type_hash, *kind, overload)?;
        }

        let class_name = |identity: TypeHash| {
            if identity == type_hash {
                name.clone()
            } else {
                self.class_name(identity)
            }
        };
        let selectors = methods
            .iter()
            .map(|(method, overload)| (method.clone(), overload))
            .chain(
                operators
                    .iter()
                    .map(|(kind, overload)| (kind.to_string(), overload)),
            )
            .chain(
                constructors
                    .iter()
                    .map(|overload| ("constructor".to_string(), overload)),
            );
        let mut seen = FxHashSet::default();
        for (selector, overload) in selectors {
            if seen.insert((selector.clone(), overload.fingerprint())) {
                continue;
            }
            let signature = overload.describe_with(&selector, &class_name);
            if config.strict_overloads {
                return Err(RegistrationError::DuplicateOverload {
                    class: name.clone(),
                    selector,
                    signature,
                });
            }
            warn!(
                class = %name,
                %signature,
                "overload shadows an earlier registration with the same signature"
            );
        }

        let mut next = self.next_sequence;
        let mut stamp = |mut overload: Overload| {
            overload.sequence = next;
            next += 1;
            overload
        };

        let mut method_table: FxHashMap<String, Vec<Overload>> = FxHashMap::default();
        for (method, overload) in methods {
            let stamped = stamp(overload);
            method_table.entry(method).or_default().push(stamped);
        }
        let mut operator_table: [Vec<Overload>; OperatorKind::COUNT] =
            std::array::from_fn(|_| Vec::new());
        for (kind, overload) in operators {
            operator_table[kind.index()].push(stamp(overload));
        }
        let constructors: Vec<Overload> = constructors.into_iter().map(&mut stamp).collect();
        self.next_sequence = next;

        let mut property_table = FxHashMap::default();
        for (property, entry) in properties {
            if property_table.contains_key(&property) {
                warn!(
                    class = %name,
                    property = %property,
                    "property redefined; keeping the latest"
                );
            }
            property_table.insert(property, entry);
        }

        let descriptor = Arc::new(ClassDescriptor {
            name,
            type_hash,
            holder,
            bases: base_edges,
            methods: method_table,
            properties: property_table,
            operators: operator_table,
            constructors,
        });
        self.classes.insert(type_hash, Arc::clone(&descriptor));

        if let (Some(held), Some(const_held)) =
            (descriptor.held_type(), descriptor.const_held_type())
        {
            if self.contains(held) {
                debug!(
                    class = descriptor.name(),
                    held = %held,
                    "held type already bound; keeping the first registrant"
                );
            } else {
                self.register(held, Arc::clone(&descriptor));
                self.register(const_held, Arc::clone(&descriptor));
                debug!(
                    class = descriptor.name(),
                    held = %held,
                    const_held = %const_held,
                    "registered held type aliases"
                );
            }
        }

        debug!(
            class = descriptor.name(),
            holder = descriptor.holder().family(),
            bases = descriptor.bases().len(),
            methods = descriptor.methods.len(),
            constructors = descriptor.constructors().len(),
            "published class"
        );
        Ok(descriptor)
    }
}

fn validate_operator(
    class: &str,
    type_hash: TypeHash,
    kind: OperatorKind,
    overload: &Overload,
) -> Result<(), RegistrationError> {
    let invalid = |reason: String| RegistrationError::InvalidOperator {
        class: class.to_string(),
        operator: kind,
        reason,
    };
    let is_own = |param: &ParamType| {
        matches!(param, ParamType::Object { class, .. } if *class == type_hash)
    };

    match kind.arity() {
        Some(arity) if overload.arity() != arity => {
            return Err(invalid(format!(
                "expects {arity} operands, got {}",
                overload.arity()
            )));
        }
        // The callee is always operand 0 of a call.
        None if !overload.params().first().is_some_and(is_own) => {
            return Err(invalid(format!("operand 0 must be {class}")));
        }
        _ => {}
    }
    if !overload.params().iter().any(is_own) {
        return Err(invalid(format!("no operand of type {class}")));
    }
    Ok(())
}

impl std::fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let classes: Vec<&str> = self.classes().map(|c| c.name()).collect();
        f.debug_struct("ClassRegistry")
            .field("classes", &classes)
            .field("identities", &self.classes.len())
            .field("next_sequence", &self.next_sequence)
            .finish()
    }
}
