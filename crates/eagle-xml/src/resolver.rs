// crates/eagle-xml/src/resolver.rs

//! Resolves a part's string references into library nodes, and rewrites
//! device-sets into external (package-less) form.
//!
//! A part names its library, deviceset, device and technology by key. The
//! chain is walked as:
//! 1. `root.libraries[library]`
//! 2. `library.devicesets[deviceset]`
//! 3. `deviceset.devices[device]`
//! 4. `device.technologies[technology]`
//!
//! Every lookup is non-owning; a dangling key is an
//! [`SchemaError::UnresolvedReference`], not a broken tree.

use crate::error::SchemaError;
use crate::log::doc_debug;
use crate::node::{Document, NodeId};
use std::collections::BTreeSet;

/// Package name given to the single device of an externalized device-set.
pub const EXTERNAL_PACKAGE: &str = "_EXTERNAL_";

/// Name of the attribute that marks a technology as external.
pub const EXTERNAL_MARKER: &str = "_EXTERNAL_";

impl Document<'_> {
    fn expect_tag(&self, id: NodeId, tag: &str) -> Result<(), SchemaError> {
        if self.tag(id)? == tag {
            Ok(())
        } else {
            Err(SchemaError::UnexpectedTag {
                expected: tag.into(),
                found: self.describe(id),
            })
        }
    }

    fn part_key(&self, part: NodeId, attribute: &str) -> Result<String, SchemaError> {
        Ok(self.attr_str(part, attribute)?.unwrap_or_default().to_string())
    }

    fn unresolved(&self, part: NodeId, segment: &'static str, path: String) -> SchemaError {
        SchemaError::UnresolvedReference {
            part: self.describe(part),
            segment,
            path,
        }
    }

    /// Looks up a library embedded in this file. For library files, this is
    /// the file's own library when its name matches.
    pub fn find_library_by_name(&self, name: &str) -> Option<NodeId> {
        let root_spec = self.spec_of(self.root).ok()?;
        if root_spec.section("libraries").is_some() {
            return self.lookup(self.root, "libraries", name).ok();
        }
        let library = self.singleton(self.root, "library").ok()??;
        let own_name = self.attr_str(library, "name").ok()?.unwrap_or_default();
        (own_name == name).then_some(library)
    }

    pub fn find_library(&self, part: NodeId) -> Result<NodeId, SchemaError> {
        self.expect_tag(part, "part")?;
        let library = self.part_key(part, "library")?;
        self.find_library_by_name(&library)
            .ok_or_else(|| self.unresolved(part, "Library", library))
    }

    pub fn find_deviceset(&self, part: NodeId) -> Result<NodeId, SchemaError> {
        let library = self.find_library(part)?;
        let deviceset = self.part_key(part, "deviceset")?;
        self.lookup(library, "devicesets", &deviceset).map_err(|_| {
            let path = format!("{}:{}", self.part_key(part, "library").unwrap_or_default(), deviceset);
            self.unresolved(part, "Deviceset", path)
        })
    }

    pub fn find_device(&self, part: NodeId) -> Result<NodeId, SchemaError> {
        let deviceset = self.find_deviceset(part)?;
        let device = self.part_key(part, "device")?;
        self.lookup(deviceset, "devices", &device).map_err(|_| {
            let path = format!(
                "{}:{}:{}",
                self.part_key(part, "library").unwrap_or_default(),
                self.part_key(part, "deviceset").unwrap_or_default(),
                device
            );
            self.unresolved(part, "Device", path)
        })
    }

    /// The technology a part uses; an unset technology means `""`.
    pub fn find_technology(&self, part: NodeId) -> Result<NodeId, SchemaError> {
        let device = self.find_device(part)?;
        let technology = self.part_key(part, "technology")?;
        self.lookup(device, "technologies", &technology).map_err(|_| {
            let path = format!(
                "{}:{}:{}:{}",
                self.part_key(part, "library").unwrap_or_default(),
                self.part_key(part, "deviceset").unwrap_or_default(),
                self.part_key(part, "device").unwrap_or_default(),
                technology
            );
            self.unresolved(part, "Technology", path)
        })
    }

    /// The library package used by a part's device. `None` for package-less
    /// devices, including externalized ones whose package is not in the
    /// library.
    pub fn find_package(&self, part: NodeId) -> Result<Option<NodeId>, SchemaError> {
        let device = self.find_device(part)?;
        let Some(package) = self.attr_str(device, "package")? else {
            return Ok(None);
        };
        let library = self.find_library(part)?;
        match self.lookup(library, "packages", package) {
            Ok(found) => Ok(Some(found)),
            Err(SchemaError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Library, deviceset and device of a part must resolve; the technology
    /// may dangle.
    pub fn check_part(&self, part: NodeId) -> Result<(), SchemaError> {
        self.find_device(part).map(|_| ())
    }

    /// Retargets a part. Only the keys that are given change.
    pub fn set_part_device(
        &mut self,
        part: NodeId,
        library: Option<&str>,
        deviceset: Option<&str>,
        device: Option<&str>,
    ) -> Result<(), SchemaError> {
        self.expect_tag(part, "part")?;
        for (attribute, value) in [("library", library), ("deviceset", deviceset), ("device", device)] {
            if let Some(value) = value {
                self.set_attr(part, attribute, value)?;
            }
        }
        Ok(())
    }

    /// Updates the value of a part attribute, adding a part-side attribute
    /// when the part has none of that name.
    pub fn set_part_attribute(&mut self, part: NodeId, name: &str, value: &str) -> Result<NodeId, SchemaError> {
        self.expect_tag(part, "part")?;
        match self.lookup(part, "attributes", name) {
            Ok(existing) => {
                self.set_attr(existing, "value", value)?;
                Ok(existing)
            }
            Err(SchemaError::NotFound { .. }) => {
                let attribute = self.create("attribute")?;
                self.set_attr(attribute, "name", name)?;
                self.set_attr(attribute, "value", value)?;
                self.add(part, "attributes", attribute)?;
                Ok(attribute)
            }
            Err(e) => Err(e),
        }
    }

    /// Rewrites a device-set into a single package-less device.
    ///
    /// All devices are removed and freed. The new device is named `""`, uses
    /// package [`EXTERNAL_PACKAGE`] and has one technology `""` carrying the
    /// union of the old technologies' attributes (the first attribute of a
    /// given name wins) plus an [`EXTERNAL_MARKER`] attribute. Returns the
    /// new device.
    pub fn externalize_deviceset(&mut self, deviceset: NodeId) -> Result<NodeId, SchemaError> {
        self.expect_tag(deviceset, "deviceset")?;

        // 1. Gather the attributes to keep.
        let mut names = BTreeSet::new();
        let mut migrated = Vec::new();
        for device in self.items(deviceset, "devices")? {
            for technology in self.items(device, "technologies")? {
                for (name, attribute) in self.entries(technology, "attributes")? {
                    if names.insert(name) {
                        migrated.push(attribute);
                    }
                }
            }
        }

        // 2. Pull them out, then drop the old devices.
        for attribute in &migrated {
            self.detach(*attribute)?;
        }
        let old = self.clear(deviceset, "devices")?;
        for device in &old {
            self.discard(*device)?;
        }

        // 3. Build the replacement.
        let device = self.create("device")?;
        self.set_attr(device, "name", "")?;
        self.set_attr(device, "package", EXTERNAL_PACKAGE)?;
        let technology = self.create("technology")?;
        self.set_attr(technology, "name", "")?;
        for attribute in migrated {
            self.add(technology, "attributes", attribute)?;
        }
        if !names.contains(EXTERNAL_MARKER) {
            let marker = self.create("attribute")?;
            self.set_attr(marker, "name", EXTERNAL_MARKER)?;
            self.add(technology, "attributes", marker)?;
        }
        self.add(device, "technologies", technology)?;
        self.add(deviceset, "devices", device)?;

        doc_debug!(
            self,
            "Externalized {} ({} devices replaced, {} attributes kept)",
            self.describe(deviceset),
            old.len(),
            names.len()
        );
        Ok(device)
    }
}
