//! Procedure namespaces as a tree of services.

use arri_schema::RpcDefinition;
use indexmap::IndexMap;

use crate::naming::pascal;

/// A procedure placed in its service.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceProcedure {
    /// Full dotted name, e.g. `users.settings.get`
    pub name: String,
    /// Last name segment, e.g. `get`
    pub method: String,
    pub rpc: RpcDefinition,
}

/// Dot-delimited procedure names unflattened into nested services.
///
/// `users.get` and `users.settings.update` produce a root with one child
/// `users`, which holds `get` and a child `settings` holding `update`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceTree {
    /// Namespace segments from the root
    pub path: Vec<String>,
    pub procedures: Vec<ServiceProcedure>,
    pub children: IndexMap<String, ServiceTree>,
}

impl ServiceTree {
    pub fn from_procedures(procedures: &IndexMap<String, RpcDefinition>) -> Self {
        let mut root = ServiceTree::default();
        for (name, rpc) in procedures {
            let mut segments: Vec<&str> = name.split('.').collect();
            let method = segments.pop().unwrap_or_default().to_string();

            let mut node = &mut root;
            for segment in segments {
                let mut path = node.path.clone();
                path.push(segment.to_string());
                node = node
                    .children
                    .entry(segment.to_string())
                    .or_insert_with(|| ServiceTree {
                        path,
                        ..Default::default()
                    });
            }
            node.procedures.push(ServiceProcedure {
                name: name.clone(),
                method,
                rpc: rpc.clone(),
            });
        }
        root
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty() && self.children.is_empty()
    }

    /// Type name of this service: the client name for the root,
    /// `<Client><Path>Service` below it.
    pub fn type_name(&self, client_name: &str) -> String {
        if self.is_root() {
            return client_name.to_string();
        }
        let path: String = self.path.iter().map(|s| pascal(s)).collect();
        format!("{client_name}{path}Service")
    }

    /// This service and all descendants, parents before children.
    pub fn flatten(&self) -> Vec<&ServiceTree> {
        let mut out = vec![self];
        for child in self.children.values() {
            out.extend(child.flatten());
        }
        out
    }
}
