pub mod assignable;
pub mod generics;
pub mod manager;
pub mod types;

pub use assignable::{is_assignable, is_signature_castable};
pub use generics::instantiate;
pub use manager::TypeManager;
pub use types::{CallSignature, Constness, Member, Operator, Type, TypeKind, TypeThunk};
