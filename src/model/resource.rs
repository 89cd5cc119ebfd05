// Copyright 2026 The Scheduler Cache Authors
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

use std::collections::HashMap;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// Floor substituted for a zero (or absent) CPU request when computing the
/// "non-zero" resource vector, so a zero-request container does not look
/// free to packing heuristics.
pub const DEFAULT_MILLI_CPU_REQUEST: i64 = 10;
/// Floor substituted for a zero (or absent) memory request, same rationale.
pub const DEFAULT_MEMORY_REQUEST_BYTES: i64 = 200 * 1024 * 1024;

/// A four-dimensional resource quantity: CPU (milli-units), memory and
/// ephemeral storage (bytes), plus an open map of extended resources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceVector {
    pub milli_cpu: i64,
    pub memory_bytes: i64,
    pub ephemeral_storage_bytes: i64,
    pub extended: HashMap<String, i64>,
}

impl ResourceVector {
    pub fn new(milli_cpu: i64, memory_bytes: i64) -> Self {
        Self {
            milli_cpu,
            memory_bytes,
            ..Default::default()
        }
    }

    /// The non-zero variant of this vector: any dimension that is zero is
    /// floored to the default non-zero request for that dimension.
    pub fn non_zero(&self) -> Self {
        Self {
            milli_cpu: if self.milli_cpu == 0 {
                DEFAULT_MILLI_CPU_REQUEST
            } else {
                self.milli_cpu
            },
            memory_bytes: if self.memory_bytes == 0 {
                DEFAULT_MEMORY_REQUEST_BYTES
            } else {
                self.memory_bytes
            },
            ephemeral_storage_bytes: self.ephemeral_storage_bytes,
            extended: self.extended.clone(),
        }
    }

    /// True if `self` is strictly less than `other` on both CPU and memory.
    /// Used by the resize decision engine, which admits only a strict
    /// inequality (no ties) on both dimensions.
    pub fn strictly_less_on_cpu_and_mem(&self, other: &ResourceVector) -> bool {
        self.milli_cpu < other.milli_cpu && self.memory_bytes < other.memory_bytes
    }
}

impl Add for &ResourceVector {
    type Output = ResourceVector;

    fn add(self, rhs: &ResourceVector) -> ResourceVector {
        let mut extended = self.extended.clone();
        for (k, v) in &rhs.extended {
            *extended.entry(k.clone()).or_insert(0) += v;
        }
        ResourceVector {
            milli_cpu: self.milli_cpu + rhs.milli_cpu,
            memory_bytes: self.memory_bytes + rhs.memory_bytes,
            ephemeral_storage_bytes: self.ephemeral_storage_bytes + rhs.ephemeral_storage_bytes,
            extended,
        }
    }
}

impl AddAssign<&ResourceVector> for ResourceVector {
    fn add_assign(&mut self, rhs: &ResourceVector) {
        self.milli_cpu += rhs.milli_cpu;
        self.memory_bytes += rhs.memory_bytes;
        self.ephemeral_storage_bytes += rhs.ephemeral_storage_bytes;
        for (k, v) in &rhs.extended {
            *self.extended.entry(k.clone()).or_insert(0) += v;
        }
    }
}

impl Sub for &ResourceVector {
    type Output = ResourceVector;

    fn sub(self, rhs: &ResourceVector) -> ResourceVector {
        let mut extended = self.extended.clone();
        for (k, v) in &rhs.extended {
            *extended.entry(k.clone()).or_insert(0) -= v;
        }
        ResourceVector {
            milli_cpu: self.milli_cpu - rhs.milli_cpu,
            memory_bytes: self.memory_bytes - rhs.memory_bytes,
            ephemeral_storage_bytes: self.ephemeral_storage_bytes - rhs.ephemeral_storage_bytes,
            extended,
        }
    }
}

impl SubAssign<&ResourceVector> for ResourceVector {
    fn sub_assign(&mut self, rhs: &ResourceVector) {
        self.milli_cpu -= rhs.milli_cpu;
        self.memory_bytes -= rhs.memory_bytes;
        self.ephemeral_storage_bytes -= rhs.ephemeral_storage_bytes;
        for (k, v) in &rhs.extended {
            *self.extended.entry(k.clone()).or_insert(0) -= v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_zero_floors_only_zero_dimensions() {
        let rv = ResourceVector::new(0, 512);
        let nz = rv.non_zero();
        assert_eq!(nz.milli_cpu, DEFAULT_MILLI_CPU_REQUEST);
        assert_eq!(nz.memory_bytes, 512);
    }

    #[test]
    fn add_and_sub_are_inverse() {
        let a = ResourceVector::new(100, 200);
        let b = ResourceVector::new(30, 40);
        let mut sum = &a + &b;
        sum -= &b;
        assert_eq!(sum, a);
    }
}
