// Copyright 2025 JiangLong.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::shared::error::KbackupError;
use kube::{Resource, ResourceExt};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// One retrieved Kubernetes object.
///
/// `kind` and `name` come from the object as retrieved, so the file layout
/// does not depend on what a filter keeps.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    pub namespace: String,
    pub kind: String,
    pub name: String,
    pub document: Value,
}

impl Manifest {
    pub fn from_resource<K>(namespace: &str, resource: &K) -> Result<Self, KbackupError>
    where
        K: Resource<DynamicType = ()> + Serialize,
    {
        Ok(Self {
            namespace: namespace.to_string(),
            kind: K::kind(&()).to_string(),
            name: resource.name_any(),
            document: serde_json::to_value(resource)?,
        })
    }
}

impl fmt::Display for Manifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.namespace, self.kind, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::ConfigMap;
    use kube::api::ObjectMeta;
    use std::collections::BTreeMap;

    #[test]
    fn test_from_typed_resource() {
        let cm = ConfigMap {
            metadata: ObjectMeta {
                name: Some("web-config".to_string()),
                namespace: Some("default".to_string()),
                ..Default::default()
            },
            data: Some(BTreeMap::from([("key".to_string(), "value".to_string())])),
            ..Default::default()
        };

        let manifest = Manifest::from_resource("default", &cm).unwrap();
        assert_eq!(manifest.kind, "ConfigMap");
        assert_eq!(manifest.name, "web-config");
        assert_eq!(manifest.document["apiVersion"], "v1");
        assert_eq!(manifest.document["kind"], "ConfigMap");
        assert_eq!(manifest.document["data"]["key"], "value");
        assert_eq!(manifest.to_string(), "default/ConfigMap/web-config");
    }
}
