//! Round robin assignment of model variables to parameter servers.

/// Maps every model variable to the parameter server holding it.
///
/// Variable `i` lives on server `i % num_servers`, so server 0 always holds
/// the first variable and the global step.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    shards: Vec<Vec<usize>>,
}

impl Placement {
    /// Creates a new `Placement`.
    ///
    /// # Arguments
    /// * `num_params` - The amount of model variables.
    /// * `num_servers` - The amount of parameter servers, at least one.
    ///
    /// # Returns
    /// A new `Placement` instance.
    pub fn new(num_params: usize, num_servers: usize) -> Self {
        let num_servers = num_servers.max(1);
        let mut shards = vec![Vec::new(); num_servers];

        for i in 0..num_params {
            shards[i % num_servers].push(i);
        }

        Self { shards }
    }

    pub fn num_servers(&self) -> usize {
        self.shards.len()
    }

    /// The indices of the variables held by `server`, in ascending order.
    pub fn shard(&self, server: usize) -> &[usize] {
        &self.shards[server]
    }

    /// Copies the variables `server` holds out of the full parameter buffer.
    ///
    /// # Arguments
    /// * `server` - The parameter server's index.
    /// * `full` - A buffer covering every variable.
    /// * `out` - Where to write `server`'s slice, resized as needed.
    pub fn scatter(&self, server: usize, full: &[f32], out: &mut Vec<f32>) {
        out.clear();
        out.extend(self.shards[server].iter().map(|&i| full[i]));
    }

    /// Writes a server's slice back into the full parameter buffer.
    ///
    /// # Arguments
    /// * `server` - The parameter server's index.
    /// * `part` - The variables `server` holds, in shard order.
    /// * `full` - A buffer covering every variable.
    pub fn gather(&self, server: usize, part: &[f32], full: &mut [f32]) {
        for (&i, &value) in self.shards[server].iter().zip(part) {
            full[i] = value;
        }
    }
}
