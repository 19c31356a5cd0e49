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

/// Backup defaults
pub const DEFAULT_FILTER: &str = ".";
pub const DEFAULT_OUTPUT_DIR: &str = "backup";
pub const MANIFEST_EXTENSION: &str = "yaml";

/// Config file lookup
pub const CONF_FILE_ENV: &str = "KBACKUP_CONF_FILE";

/// Scale target kind an HPA must name to belong to a deployment
pub const KIND_DEPLOYMENT: &str = "Deployment";

/// Kinds fetched by name from a pod template reference
pub const KIND_CONFIGMAP: &str = "ConfigMap";
pub const KIND_SECRET: &str = "Secret";
pub const KIND_PVC: &str = "PersistentVolumeClaim";
pub const KIND_SERVICE_ACCOUNT: &str = "ServiceAccount";

/// Service account every namespace carries; never backed up as an association
pub const DEFAULT_SERVICE_ACCOUNT: &str = "default";

/// RFC 1123 label, the format of namespace names
pub const NAMESPACE_NAME_PATTERN: &str = r"^[a-z0-9]([-a-z0-9]{0,61}[a-z0-9])?$";
