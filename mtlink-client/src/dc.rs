//! DC endpoints and the server configuration table.

/// One server endpoint.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct DcOption {
    pub id:      u32,
    pub address: String,
    pub port:    u16,
}

impl DcOption {
    pub fn new(id: u32, address: impl Into<String>, port: u16) -> Self {
        Self { id, address: address.into(), port }
    }
}

/// The table of known DCs.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DcConfiguration {
    pub dc_options: Vec<DcOption>,
}

impl DcConfiguration {
    pub fn new(dc_options: Vec<DcOption>) -> Self {
        Self { dc_options }
    }

    pub fn is_empty(&self) -> bool { self.dc_options.is_empty() }

    /// First option registered for `dc_id`.
    pub fn option_for(&self, dc_id: u32) -> Option<&DcOption> {
        self.dc_options.iter().find(|o| o.id == dc_id)
    }

    /// Replace the option with the same id, or append a new one.
    pub fn upsert(&mut self, option: DcOption) {
        match self.dc_options.iter_mut().find(|o| o.id == option.id) {
            Some(existing) => *existing = option,
            None           => self.dc_options.push(option),
        }
    }
}

/// Bootstrap production DC table.
impl Default for DcConfiguration {
    fn default() -> Self {
        Self::new(
            [
                (1, "149.154.175.53"),
                (2, "149.154.167.51"),
                (3, "149.154.175.100"),
                (4, "149.154.167.91"),
                (5, "91.108.56.130"),
            ]
            .into_iter()
            .map(|(id, address)| DcOption::new(id, address, 443))
            .collect(),
        )
    }
}
