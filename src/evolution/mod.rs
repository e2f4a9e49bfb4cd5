/*!
Schema and partition evolution (§4.F, §4.G): computing change lists between two versions of a
schema or partition spec and classifying them as compatible or breaking.
*/
pub mod partition;
pub mod schema;
