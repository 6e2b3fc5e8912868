//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the storefront tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod discount;
pub mod extra;
pub mod merchant;
pub mod order;
pub mod order_item;
pub mod order_item_extra;
pub mod product;
pub mod user;

// Re-export specific types to avoid conflicts
pub use discount::{Column as DiscountColumn, Entity as Discount, Model as DiscountModel};
pub use extra::{Column as ExtraColumn, Entity as Extra, Model as ExtraModel};
pub use merchant::{Column as MerchantColumn, Entity as Merchant, Model as MerchantModel};
pub use order::{Column as OrderColumn, Entity as Order, Model as OrderModel, OrderStatus};
pub use order_item::{
    Column as OrderItemColumn, Entity as OrderItem, ItemKind, Model as OrderItemModel,
};
pub use order_item_extra::{
    Column as OrderItemExtraColumn, Entity as OrderItemExtra, Model as OrderItemExtraModel,
};
pub use product::{Column as ProductColumn, Entity as Product, Model as ProductModel};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
