// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod accounts;
pub mod dashboard;
pub mod doctor;
pub mod fx;
pub mod postings;
pub mod sections;
