//! Table definitions for the catalog, accounts, reviews, promotions and orders, in creation order.

#[derive(Clone, Copy, Debug)]
pub struct ForeignKey {
    pub table: &'static str,
    pub column: &'static str,
    pub on_delete: &'static str,
}

#[derive(Clone, Copy, Debug)]
pub struct ColumnDef {
    pub name: &'static str,
    pub sql_type: &'static str,
    pub nullable: bool,
    pub default: Option<&'static str>,
    pub references: Option<ForeignKey>,
}

impl ColumnDef {
    pub const fn not_null(self) -> Self {
        ColumnDef { nullable: false, ..self }
    }

    pub const fn default(self, expr: &'static str) -> Self {
        ColumnDef {
            default: Some(expr),
            ..self
        }
    }

    pub const fn references(self, table: &'static str, on_delete: &'static str) -> Self {
        ColumnDef {
            references: Some(ForeignKey {
                table,
                column: "id",
                on_delete,
            }),
            ..self
        }
    }
}

const fn col(name: &'static str, sql_type: &'static str) -> ColumnDef {
    ColumnDef {
        name,
        sql_type,
        nullable: true,
        default: None,
        references: None,
    }
}

const ID: ColumnDef = col("id", "BIGINT GENERATED BY DEFAULT AS IDENTITY").not_null();
const CREATED_AT: ColumnDef = col("created_at", "TIMESTAMPTZ").not_null().default("NOW()");
const UPDATED_AT: ColumnDef = col("updated_at", "TIMESTAMPTZ").not_null().default("NOW()");
const IS_ACTIVE: ColumnDef = col("is_active", "BOOLEAN").not_null().default("TRUE");

#[derive(Clone, Copy, Debug)]
pub struct CheckDef {
    pub name: &'static str,
    pub expression: &'static str,
}

#[derive(Clone, Copy, Debug)]
pub struct IndexDef {
    pub name: &'static str,
    pub columns: &'static [&'static str],
}

#[derive(Clone, Copy, Debug)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [ColumnDef],
    pub primary_key: &'static [&'static str],
    pub unique: &'static [&'static [&'static str]],
    pub checks: &'static [CheckDef],
    pub indexes: &'static [IndexDef],
}

pub const AUTHORS: TableDef = TableDef {
    name: "authors",
    columns: &[
        ID,
        col("name", "VARCHAR(200)").not_null(),
        col("biography", "TEXT"),
        col("image_url", "VARCHAR(255)"),
        col("birth_date", "DATE"),
        col("nationality", "VARCHAR(100)"),
        col("website", "VARCHAR(255)"),
        IS_ACTIVE,
        CREATED_AT,
        UPDATED_AT,
    ],
    primary_key: &["id"],
    unique: &[],
    checks: &[],
    indexes: &[IndexDef {
        name: "idx_authors_name",
        columns: &["name"],
    }],
};

pub const PUBLISHERS: TableDef = TableDef {
    name: "publishers",
    columns: &[
        ID,
        col("name", "VARCHAR(150)").not_null(),
        col("description", "TEXT"),
        col("logo_url", "VARCHAR(255)"),
        col("website", "VARCHAR(255)"),
        col("country", "VARCHAR(100)"),
        IS_ACTIVE,
        CREATED_AT,
        UPDATED_AT,
    ],
    primary_key: &["id"],
    unique: &[&["name"]],
    checks: &[],
    indexes: &[],
};

pub const CATEGORIES: TableDef = TableDef {
    name: "categories",
    columns: &[
        ID,
        col("name", "VARCHAR(100)").not_null(),
        col("image_url", "VARCHAR(255)"),
        col("description", "TEXT"),
        col("parent_id", "BIGINT").references("categories", "SET NULL"),
        col("display_order", "INTEGER").not_null().default("0"),
        IS_ACTIVE,
        CREATED_AT,
        UPDATED_AT,
    ],
    primary_key: &["id"],
    unique: &[&["name"]],
    checks: &[CheckDef {
        name: "categories_not_own_parent",
        expression: "parent_id IS NULL OR parent_id <> id",
    }],
    indexes: &[IndexDef {
        name: "idx_categories_parent_id",
        columns: &["parent_id"],
    }],
};

pub const BOOKS: TableDef = TableDef {
    name: "books",
    columns: &[
        ID,
        col("sku", "VARCHAR(100)"),
        col("title", "VARCHAR(255)").not_null(),
        col("isbn", "VARCHAR(13)"),
        col("description", "TEXT"),
        col("price", "NUMERIC(10,2)").not_null(),
        col("original_price", "NUMERIC(10,2)"),
        col("stock", "INTEGER").not_null().default("0"),
        col("min_stock", "INTEGER").not_null().default("5"),
        col("cover_url", "VARCHAR(255)"),
        col("extra_images", "TEXT"),
        col("publisher_id", "BIGINT").references("publishers", "SET NULL"),
        col("publication_date", "DATE"),
        col("page_count", "INTEGER"),
        col("language", "VARCHAR(50)").not_null().default("'español'"),
        col("weight_kg", "NUMERIC(8,3)"),
        col("dimensions", "VARCHAR(50)"),
        col("format", "VARCHAR(50)"),
        IS_ACTIVE,
        col("is_featured", "BOOLEAN").not_null().default("FALSE"),
        col("is_new", "BOOLEAN").not_null().default("FALSE"),
        col("is_bestseller", "BOOLEAN").not_null().default("FALSE"),
        col("views", "INTEGER").not_null().default("0"),
        col("total_sales", "INTEGER").not_null().default("0"),
        CREATED_AT,
        UPDATED_AT,
    ],
    primary_key: &["id"],
    unique: &[&["sku"], &["isbn"]],
    checks: &[
        CheckDef {
            name: "books_price_non_negative",
            expression: "price >= 0 AND (original_price IS NULL OR original_price >= 0)",
        },
        CheckDef {
            name: "books_stock_non_negative",
            expression: "stock >= 0",
        },
        CheckDef {
            name: "books_page_count_positive",
            expression: "page_count IS NULL OR page_count > 0",
        },
    ],
    indexes: &[
        IndexDef {
            name: "idx_books_publisher_id",
            columns: &["publisher_id"],
        },
        IndexDef {
            name: "idx_books_title",
            columns: &["title"],
        },
    ],
};

pub const BOOK_AUTHORS: TableDef = TableDef {
    name: "book_authors",
    columns: &[
        col("book_id", "BIGINT").not_null().references("books", "CASCADE"),
        col("author_id", "BIGINT").not_null().references("authors", "CASCADE"),
        col("position", "INTEGER").not_null().default("1"),
    ],
    primary_key: &["book_id", "author_id"],
    unique: &[],
    checks: &[],
    indexes: &[IndexDef {
        name: "idx_book_authors_author_id",
        columns: &["author_id"],
    }],
};

pub const BOOK_CATEGORIES: TableDef = TableDef {
    name: "book_categories",
    columns: &[
        col("book_id", "BIGINT").not_null().references("books", "CASCADE"),
        col("category_id", "BIGINT").not_null().references("categories", "CASCADE"),
    ],
    primary_key: &["book_id", "category_id"],
    unique: &[],
    checks: &[],
    indexes: &[IndexDef {
        name: "idx_book_categories_category_id",
        columns: &["category_id"],
    }],
};

pub const USERS: TableDef = TableDef {
    name: "users",
    columns: &[
        ID,
        col("first_name", "VARCHAR(100)").not_null(),
        col("last_name", "VARCHAR(100)").not_null(),
        col("email", "VARCHAR(255)").not_null(),
        col("password_hash", "VARCHAR(255)").not_null(),
        col("phone", "VARCHAR(20)"),
        col("role", "VARCHAR(20)").not_null().default("'customer'"),
        col("accepts_marketing", "BOOLEAN").not_null().default("FALSE"),
        col("last_active_at", "TIMESTAMPTZ"),
        IS_ACTIVE,
        col("email_verified_at", "TIMESTAMPTZ"),
        CREATED_AT,
        UPDATED_AT,
    ],
    primary_key: &["id"],
    unique: &[&["email"]],
    checks: &[CheckDef {
        name: "users_role_known",
        expression: "role IN ('customer', 'admin', 'staff')",
    }],
    indexes: &[],
};

pub const REVIEWS: TableDef = TableDef {
    name: "reviews",
    columns: &[
        ID,
        col("book_id", "BIGINT").not_null().references("books", "CASCADE"),
        col("user_id", "BIGINT").not_null().references("users", "CASCADE"),
        col("rating", "INTEGER").not_null(),
        col("title", "VARCHAR(255)"),
        col("comment", "TEXT"),
        col("is_verified", "BOOLEAN").not_null().default("FALSE"),
        col("helpful_count", "INTEGER").not_null().default("0"),
        col("not_helpful_count", "INTEGER").not_null().default("0"),
        CREATED_AT,
        UPDATED_AT,
    ],
    primary_key: &["id"],
    unique: &[&["book_id", "user_id"]],
    checks: &[CheckDef {
        name: "reviews_rating_range",
        expression: "rating BETWEEN 1 AND 5",
    }],
    indexes: &[IndexDef {
        name: "idx_reviews_user_id",
        columns: &["user_id"],
    }],
};

pub const WISHLIST_ITEMS: TableDef = TableDef {
    name: "wishlist_items",
    columns: &[
        ID,
        col("user_id", "BIGINT").not_null().references("users", "CASCADE"),
        col("book_id", "BIGINT").not_null().references("books", "CASCADE"),
        col("added_at", "TIMESTAMPTZ").not_null().default("NOW()"),
    ],
    primary_key: &["id"],
    unique: &[&["user_id", "book_id"]],
    checks: &[],
    indexes: &[],
};

pub const PROMOTIONS: TableDef = TableDef {
    name: "promotions",
    columns: &[
        ID,
        col("name", "VARCHAR(255)").not_null(),
        col("description", "TEXT"),
        col("discount_type", "VARCHAR(20)").not_null(),
        col("value", "NUMERIC(10,2)").not_null(),
        col("min_purchase", "NUMERIC(10,2)").not_null().default("0"),
        col("starts_at", "TIMESTAMPTZ").not_null().default("NOW()"),
        col("ends_at", "TIMESTAMPTZ"),
        IS_ACTIVE,
        col("max_uses", "INTEGER"),
        col("current_uses", "INTEGER").not_null().default("0"),
        CREATED_AT,
        UPDATED_AT,
    ],
    primary_key: &["id"],
    unique: &[],
    checks: &[
        CheckDef {
            name: "promotions_discount_type_known",
            expression: "discount_type IN ('percentage', 'fixed_amount')",
        },
        CheckDef {
            name: "promotions_value_in_range",
            expression: "value >= 0 AND (discount_type <> 'percentage' OR value <= 100)",
        },
    ],
    indexes: &[],
};

pub const COUPONS: TableDef = TableDef {
    name: "coupons",
    columns: &[
        ID,
        col("code", "VARCHAR(50)").not_null(),
        col("promotion_id", "BIGINT").not_null().references("promotions", "CASCADE"),
        col("expires_at", "TIMESTAMPTZ"),
        col("usage_limit", "INTEGER"),
        col("times_used", "INTEGER").not_null().default("0"),
        IS_ACTIVE,
        col("first_purchase_only", "BOOLEAN").not_null().default("FALSE"),
        CREATED_AT,
        UPDATED_AT,
    ],
    primary_key: &["id"],
    unique: &[&["code"]],
    checks: &[],
    indexes: &[IndexDef {
        name: "idx_coupons_promotion_id",
        columns: &["promotion_id"],
    }],
};

pub const PROMOTION_BOOKS: TableDef = TableDef {
    name: "promotion_books",
    columns: &[
        col("promotion_id", "BIGINT").not_null().references("promotions", "CASCADE"),
        col("book_id", "BIGINT").not_null().references("books", "CASCADE"),
    ],
    primary_key: &["promotion_id", "book_id"],
    unique: &[],
    checks: &[],
    indexes: &[],
};

pub const PROMOTION_CATEGORIES: TableDef = TableDef {
    name: "promotion_categories",
    columns: &[
        col("promotion_id", "BIGINT").not_null().references("promotions", "CASCADE"),
        col("category_id", "BIGINT").not_null().references("categories", "CASCADE"),
    ],
    primary_key: &["promotion_id", "category_id"],
    unique: &[],
    checks: &[],
    indexes: &[],
};

pub const ORDERS: TableDef = TableDef {
    name: "orders",
    columns: &[
        ID,
        col("order_number", "VARCHAR(50)"),
        col("user_id", "BIGINT").not_null().references("users", "RESTRICT"),
        col("placed_at", "TIMESTAMPTZ").not_null().default("NOW()"),
        col("subtotal", "NUMERIC(10,2)").not_null(),
        col("discount_total", "NUMERIC(10,2)").not_null().default("0"),
        col("shipping_cost", "NUMERIC(10,2)").not_null().default("0"),
        col("tax", "NUMERIC(10,2)").not_null().default("0"),
        col("total", "NUMERIC(10,2)").not_null(),
        col("status", "VARCHAR(20)").not_null().default("'pending_payment'"),
        col("shipping_address", "TEXT"),
        col("payment_gateway", "VARCHAR(50)"),
        col("gateway_payment_id", "VARCHAR(255)"),
        col("payment_status", "VARCHAR(50)").not_null().default("'pending'"),
        col("tracking_code", "VARCHAR(100)"),
        col("shipped_at", "TIMESTAMPTZ"),
        col("estimated_delivery_at", "TIMESTAMPTZ"),
        col("delivered_at", "TIMESTAMPTZ"),
        col("coupon_code", "VARCHAR(50)"),
        col("coupon_discount", "NUMERIC(10,2)").not_null().default("0"),
        col("notes", "TEXT"),
        CREATED_AT,
        UPDATED_AT,
    ],
    primary_key: &["id"],
    unique: &[&["order_number"], &["gateway_payment_id"]],
    checks: &[
        CheckDef {
            name: "orders_status_known",
            expression: "status IN ('pending_payment', 'paid', 'processing', 'shipped', 'delivered', 'cancelled')",
        },
        CheckDef {
            name: "orders_amounts_non_negative",
            expression: "subtotal >= 0 AND discount_total >= 0 AND shipping_cost >= 0 AND tax >= 0 AND total >= 0",
        },
    ],
    indexes: &[
        IndexDef {
            name: "idx_orders_user_id",
            columns: &["user_id"],
        },
        IndexDef {
            name: "idx_orders_status",
            columns: &["status"],
        },
    ],
};

pub const ORDER_ITEMS: TableDef = TableDef {
    name: "order_items",
    columns: &[
        ID,
        col("order_id", "BIGINT").not_null().references("orders", "CASCADE"),
        col("book_id", "BIGINT").not_null().references("books", "RESTRICT"),
        col("quantity", "INTEGER").not_null(),
        col("unit_price", "NUMERIC(10,2)").not_null(),
        col("book_title", "VARCHAR(255)").not_null(),
        col("book_sku", "VARCHAR(100)"),
        col("book_isbn", "VARCHAR(13)"),
    ],
    primary_key: &["id"],
    unique: &[],
    checks: &[CheckDef {
        name: "order_items_quantity_positive",
        expression: "quantity > 0",
    }],
    indexes: &[IndexDef {
        name: "idx_order_items_order_id",
        columns: &["order_id"],
    }],
};

/// Every table, parents before children.
pub const TABLES: &[TableDef] = &[
    AUTHORS,
    PUBLISHERS,
    CATEGORIES,
    BOOKS,
    BOOK_AUTHORS,
    BOOK_CATEGORIES,
    USERS,
    REVIEWS,
    WISHLIST_ITEMS,
    PROMOTIONS,
    COUPONS,
    PROMOTION_BOOKS,
    PROMOTION_CATEGORIES,
    ORDERS,
    ORDER_ITEMS,
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn foreign_keys_point_at_earlier_tables() {
        let mut seen = HashSet::new();
        for t in TABLES {
            for c in t.columns {
                if let Some(fk) = c.references {
                    assert!(
                        fk.table == t.name || seen.contains(fk.table),
                        "{}.{} references {} before it exists",
                        t.name,
                        c.name,
                        fk.table
                    );
                }
            }
            seen.insert(t.name);
        }
    }

    #[test]
    fn keys_name_real_columns() {
        for t in TABLES {
            let cols: HashSet<&str> = t.columns.iter().map(|c| c.name).collect();
            for k in t.primary_key.iter().chain(t.unique.iter().flat_map(|u| u.iter())) {
                assert!(cols.contains(k), "{} has no column {}", t.name, k);
            }
            for idx in t.indexes {
                for k in idx.columns {
                    assert!(cols.contains(k), "{} index {} has no column {}", t.name, idx.name, k);
                }
            }
        }
    }
}
